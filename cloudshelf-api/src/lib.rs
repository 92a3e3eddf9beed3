mod client;

pub use client::{
    ApiError, ApiErrorClass, DiskClient, Link, ListQuery, OperationStatus, Resource,
    ResourcePage, ResourceType,
};
