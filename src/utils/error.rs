use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    /// `size` is `None` when the body limit cut the upload off before it was fully read.
    #[error("File size exceeds maximum allowed size of {}MB", .max / (1024 * 1024))]
    FileTooLarge { size: Option<usize>, max: usize },

    #[error("File type not allowed: {extension}. Supported types: .pdf, .png, .jpg, .jpeg")]
    UnsupportedFileType { extension: String },

    #[error("File MIME type '{detected}' does not match extension '{extension}'")]
    MimeMismatch { detected: String, extension: String },

    #[error("No OpenAI API key was provided")]
    MissingApiKey,

    #[error("API key rejected: {message}")]
    InvalidApiKey { message: String },

    #[error("Rate limited by model API: {message}")]
    RateLimited { message: String },

    #[error("Model API returned {status}: {message}")]
    ModelApi { status: u16, message: String },

    #[error("Model response did not match the report shape: {message}")]
    MalformedResponse { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("PDF parsing error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },
}

pub type Result<T> = std::result::Result<T, AnalystError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Credential,
    RateLimit,
    Upstream,
    Configuration,
    NotFound,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalystError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileTooLarge { .. }
            | Self::UnsupportedFileType { .. }
            | Self::MimeMismatch { .. }
            | Self::ValidationError { .. } => ErrorCategory::Input,
            Self::MissingApiKey | Self::InvalidApiKey { .. } => ErrorCategory::Credential,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::ModelApi { .. } | Self::MalformedResponse { .. } | Self::ApiError(_) => {
                ErrorCategory::Upstream
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::PdfError(_)
            | Self::ImageError(_)
            | Self::CsvError(_)
            | Self::IoError(_)
            | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::RateLimit | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Credential | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::FileTooLarge { .. } | Self::UnsupportedFileType { .. } | Self::MimeMismatch { .. } => {
                format!("File Validation Failed: {}", self)
            }
            Self::MissingApiKey => "Please enter your OpenAI API key".to_string(),
            Self::InvalidApiKey { .. } => "The OpenAI API key was rejected".to_string(),
            Self::RateLimited { message } => format!("The model API is rate limiting requests: {}", message),
            Self::ModelApi { status, message } => {
                format!("Analysis Failed: model API error {} ({})", status, message)
            }
            Self::MalformedResponse { .. } => {
                "Analysis Failed: the model did not return a well-formed report".to_string()
            }
            Self::ApiError(_) => "Analysis Failed: could not reach the model API".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "Upload a file no larger than 10MB",
            Self::UnsupportedFileType { .. } => "Upload a PDF, PNG or JPG document",
            Self::MimeMismatch { .. } => "Make sure the file extension matches the actual file contents",
            Self::MissingApiKey => {
                "Set OPENAI_API_KEY, add it to the secrets file or pass --api-key"
            }
            Self::InvalidApiKey { .. } => "Check that the API key is correct and active",
            Self::RateLimited { .. } => "Wait a moment and submit the document again",
            Self::ModelApi { .. } | Self::ApiError(_) => {
                "Check network connectivity and the configured api_base"
            }
            Self::MalformedResponse { .. } => "Run the analysis again; model output varies between runs",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => "Review the configuration file and command line flags",
            Self::NotFound { .. } => "Analyze the document first, then export it",
            Self::ValidationError { .. } => "Correct the input and try again",
            Self::PdfError(_) | Self::ImageError(_) => "Re-export the document from its source and retry",
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                "Check file permissions and available disk space"
            }
        }
    }
}
