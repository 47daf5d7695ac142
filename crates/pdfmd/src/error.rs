use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{} does not look like a PDF (use --force to convert it anyway)", .0.display())]
    NotPdf(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid layout config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: pdf::ConfigError,
    },
}
