#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Page {page} is out of range: {path} has {count} pages")]
    PageOutOfRange {
        path: String,
        page: u32,
        count: usize,
    },
}
