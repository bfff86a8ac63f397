//! Network transports

pub mod grpc;

pub use grpc::OtlpGrpcServer;
