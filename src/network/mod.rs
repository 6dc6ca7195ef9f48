pub mod factory;
pub mod h_input;
pub mod net_type;
pub mod network;
pub mod output_blending;
pub mod plain;
pub mod uesmann;

pub use factory::{
    load_net, make_net, make_net_for, make_net_from_tag, read_net, save_net, write_net,
};
pub use h_input::HInputNet;
pub use net_type::NetType;
pub use network::Net;
pub use output_blending::OutputBlendingNet;
pub use plain::PlainNet;
pub use uesmann::UesNet;
