#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Venue {
    Upstream,
    Amm,
}

/// One leg of a split route: a fraction of the total sent to one venue
/// (spec §4.6 "a single logical trade executed as two or more parallel
/// allocations").
#[derive(Clone, Debug)]
pub struct Allocation {
    pub venue: Venue,
    pub amount_in: u128,
    pub amount_out: u128,
    pub gas_units: u64,
}

#[derive(Clone, Debug)]
pub struct OptimizeRequest {
    pub src_token: String,
    pub dst_token: String,
    pub total_amount: u128,
    pub chain_id: u64,
}

#[derive(Clone, Debug)]
pub struct OptimizeResult {
    pub best_fraction: f64,
    pub allocations: Vec<Allocation>,
    pub net_output: u128,
    pub improvement_bps: f64,
    pub split_beneficial: bool,
}

#[derive(Clone, Debug)]
pub struct ExecutionRecord {
    pub allocation: Venue,
    pub expected_out: u128,
    pub actual_out: Option<u128>,
    pub realized_slippage_bps: Option<f64>,
    pub error: Option<String>,
}
