use thiserror::Error;

pub type Result<T> = std::result::Result<T, StlError>;

#[derive(Debug, Error)]
pub enum StlError {
    #[error("STL raw data in bytes is required")]
    MissingData,

    #[error("STL file too short to contain GSI header: {len} bytes")]
    TooShort { len: usize },

    #[error("invalid EBU-STL file, bad Disk Format Code: {dfc:?}")]
    InvalidDiskFormatCode { dfc: String },

    #[error("GSI block must be 1024 bytes, got {len}")]
    InvalidGsiLength { len: usize },

    #[error(
        "data does not contain teletext/OP-47 subtitle data: found {found} sync patterns (0x55 0x55 0x27), need at least {required}"
    )]
    NoTeletextData { found: usize, required: usize },

    #[error("subtitle index {index} does not fit a 16-bit subtitle number")]
    SubtitleNumberOverflow { index: u32 },

    #[error("invalid frame rate: {value}")]
    InvalidFrameRate { value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StlError {
    pub fn invalid_frame_rate(value: impl ToString) -> Self {
        Self::InvalidFrameRate {
            value: value.to_string(),
        }
    }
}
