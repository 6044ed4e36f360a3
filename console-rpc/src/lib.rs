pub mod error;
pub mod naming;
pub mod protocol;
pub mod spawn;
pub mod teammate;

pub use error::{Result, RpcError};
pub use naming::next_available_name;
pub use protocol::{InboundLine, RequestLine, ResponseLine, RpcCommand, RpcEvent, parse_inbound_line};
pub use spawn::{SpawnContext, SpawnOpts, SpawnOutcome, TeammateRegistry};
pub use teammate::{CloseInfo, RpcState, StartOpts, TeammateRpc};
