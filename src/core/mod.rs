//! Core types shared by the runner, the built-in engine and the HTTP exposure

pub mod engine;
pub mod error;
pub mod operation;
pub mod options;
pub mod request;
pub mod response;

pub use engine::{ExecutionContext, ExecutionEngine, ExecutionParams};
pub use error::{ClassifyError, ConfigError, ExecutionFailure, HttpQueryError};
pub use operation::{OperationKind, classify, select_operation};
pub use options::{
    DefaultErrorFormatter, ErrorFormatter, FieldResolver, LogAction, LogFunction, LogMessage,
    LogStep, OptionsFactory, OptionsSource, ParamsFormatter, QueryOptions, ResponseFormatter,
    ValidationRule,
};
pub use request::{
    HttpQueryRequest, ParsedDocument, QueryInput, RawOperation, RequestPayload, VariablesInput,
    parse_document,
};
pub use response::{ExecutionResult, FormattedError, Location, PathSegment};
