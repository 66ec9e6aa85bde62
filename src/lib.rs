//! Takes DynamoDB Streams event records and republishes them as EventBridge
//! events, with attribute values decoded to native types and a per-field
//! change summary attached to each record.

pub mod aws_clients;
pub mod lambda_structure;
pub mod publish;
pub mod result;
pub mod streams;
pub mod test_tools;
