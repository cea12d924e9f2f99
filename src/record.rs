use serde::Serialize;

/// Round a seconds value to the nearest microsecond, matching the spec's
/// `round_to_int(1_000_000 * value)` conversion used for every time-valued
/// exported field.
pub fn round_to_micros(seconds: f64) -> i64 {
    (seconds * 1_000_000.0).round() as i64
}

/// The 44-field record exported for one valid, completed flow.
///
/// Field order matches §6.2 of the spec exactly; this is also the order
/// `csv::Writer` emits them in since `Serialize` is derived on a struct, not
/// a map.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRecord {
    pub srcip: String,
    pub srcport: u16,
    pub dstip: String,
    pub dstport: u16,
    pub proto: u8,

    pub total_fpackets: u64,
    pub total_fvolume: u64,
    pub total_bpackets: u64,
    pub total_bvolume: u64,

    pub min_fpktl: i64,
    pub mean_fpktl: i64,
    pub max_fpktl: i64,
    pub std_fpktl: i64,

    pub min_bpktl: i64,
    pub mean_bpktl: i64,
    pub max_bpktl: i64,
    pub std_bpktl: i64,

    pub min_fiat: i64,
    pub mean_fiat: i64,
    pub max_fiat: i64,
    pub std_fiat: i64,

    pub min_biat: i64,
    pub mean_biat: i64,
    pub max_biat: i64,
    pub std_biat: i64,

    pub duration: i64,

    pub min_active: i64,
    pub mean_active: i64,
    pub max_active: i64,
    pub std_active: i64,

    pub min_idle: i64,
    pub mean_idle: i64,
    pub max_idle: i64,
    pub std_idle: i64,

    pub sflow_fpackets: u64,
    pub sflow_fbytes: u64,
    pub sflow_bpackets: u64,
    pub sflow_bbytes: u64,

    pub fpsh_cnt: u64,
    pub bpsh_cnt: u64,
    pub furg_cnt: u64,
    pub burg_cnt: u64,

    pub total_fhlen: u64,
    pub total_bhlen: u64,
}
