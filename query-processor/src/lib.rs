//! Validates and executes GraphQL operations, caching query results in two tiers
//! keyed by what each result turned out to vary by.

#![warn(unreachable_pub)]

pub mod json_ext;

mod batching;
pub mod cache;
pub mod configuration;
pub mod context;
pub mod error;
pub mod executor;
pub mod graphql;
pub mod persisted_queries;
mod processor;
mod request;
mod response;
mod scope;
mod spec;
pub mod validation;

pub use configuration::Configuration;
pub use context::CacheMetadata;
pub use context::MaxAge;
pub use context::ResolveContext;
pub use executor::ExecutionRequest;
pub use executor::ExecutionResult;
pub use executor::Executor;
pub use processor::ProcessorRequest;
pub use processor::QueryProcessor;
pub use processor::QueryProcessorBuilder;
pub use request::GraphQLRequest;
pub use request::OperationParams;
pub use response::GraphQLResponse;
pub use response::QueryResult;
pub use scope::BYPASS_FIELD_SECURITY_PERMISSION;
pub use scope::Permissions;
pub use scope::RequestScope;
pub use spec::OperationKind;
