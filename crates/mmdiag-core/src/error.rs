pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty name for {field}")]
    EmptyName { field: &'static str },

    #[error("{field} must be a non-empty '0x'-prefixed hex string, got '{value}'")]
    MalformedHex { field: &'static str, value: String },

    #[error("memory region '{region}' in map '{map}' has zero size")]
    ZeroSize { map: String, region: String },

    #[error("memory region '{region}' in map '{map}' extends past the 64-bit address space")]
    RegionTooLarge { map: String, region: String },

    #[error(
        "link ['{target_map}', '{target_region}'] on region '{region}' is a dangling reference"
    )]
    DanglingLink {
        region: String,
        target_map: String,
        target_region: String,
    },

    #[error(
        "link ['{target_map}', '{target_region}'] on region '{region}' targets a region of different size (0x{expected:x} vs 0x{found:x})"
    )]
    LinkSizeMismatch {
        region: String,
        target_map: String,
        target_region: String,
        expected: u64,
        found: u64,
    },

    #[error("invalid diagram description: {0}")]
    Json(#[from] serde_json::Error),
}
