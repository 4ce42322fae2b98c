//! The channels to long living tasks live here

pub use ws_manager_chan::{
    start_ws_manager, WsManagerChan, WsManagerMessage, WsMessage,
};

mod ws_manager_chan;
