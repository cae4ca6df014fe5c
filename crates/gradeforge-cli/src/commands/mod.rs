pub mod grade;
pub mod init;
pub mod list;
pub mod summary;
