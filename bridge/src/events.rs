#[derive(Clone, Debug)]
pub enum BridgeEvent {
    Placed { bridge_id: String, mapping_id: String },
    Replaced { old_bridge_id: String, new_bridge_id: String, mapping_id: String },
    Filled { bridge_id: String },
    Cancelled { bridge_id: String },
    Error { bridge_id: String, reason: String },
}
