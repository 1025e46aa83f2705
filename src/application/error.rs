use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::repos::RepoError, config::LoadError, domain::error::DomainError,
    infra::error::InfraError, presentation::views::TemplateRenderError,
};

/// An error flattened into its message chain for reporting.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound(_) => 2,
            AppError::Config(_) | AppError::Validation(_) | AppError::Domain(_) => 64,
            AppError::Repo(RepoError::Unavailable(_)) => 69,
            AppError::Infra(InfraError::Io(_)) | AppError::Infra(InfraError::Fixture { .. }) => 66,
            AppError::Infra(_) | AppError::Render(_) | AppError::Unexpected(_) => 1,
        }
    }

    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "Resource not found",
            AppError::Config(_) => "Configuration could not be loaded",
            AppError::Domain(_) | AppError::Validation(_) => "Request could not be processed",
            AppError::Repo(RepoError::Unavailable(_)) => "Content repository unavailable",
            AppError::Infra(InfraError::Fixture { .. }) | AppError::Infra(InfraError::Io(_)) => {
                "Input files could not be read"
            }
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Render(_) => "Markup could not be rendered",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
