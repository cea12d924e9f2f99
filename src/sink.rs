use std::fs::File;
use std::path::Path;

use crate::error::Result;
use crate::record::FlowRecord;

/// Destination for completed flow records.
///
/// Kept as a trait so the CLI can write CSV while tests collect records
/// in memory without touching the filesystem.
pub trait Sink {
    fn write(&mut self, record: &FlowRecord) -> Result<()>;

    /// Flush any buffered output. Default no-op for sinks that write
    /// synchronously.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// CSV file sink, header written on first record.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(CsvSink {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl Sink for CsvSink {
    fn write(&mut self, record: &FlowRecord) -> Result<()> {
        self.writer.serialize(record)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink used by tests and anywhere the caller wants the records
/// directly rather than serialized.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<FlowRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }
}

impl Sink for VecSink {
    fn write(&mut self, record: &FlowRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_record() -> FlowRecord {
        FlowRecord {
            srcip: "10.0.0.1".into(),
            srcport: 1234,
            dstip: "10.0.0.2".into(),
            dstport: 80,
            proto: 6,
            total_fpackets: 1,
            total_fvolume: 60,
            total_bpackets: 1,
            total_bvolume: 100,
            min_fpktl: 60,
            mean_fpktl: 60,
            max_fpktl: 60,
            std_fpktl: 0,
            min_bpktl: 100,
            mean_bpktl: 100,
            max_bpktl: 100,
            std_bpktl: 0,
            min_fiat: 0,
            mean_fiat: 0,
            max_fiat: 0,
            std_fiat: 0,
            min_biat: 0,
            mean_biat: 0,
            max_biat: 0,
            std_biat: 0,
            duration: 300_000,
            min_active: 300_000,
            mean_active: 300_000,
            max_active: 300_000,
            std_active: 0,
            min_idle: 0,
            mean_idle: 0,
            max_idle: 0,
            std_idle: 0,
            sflow_fpackets: 1,
            sflow_fbytes: 60,
            sflow_bpackets: 1,
            sflow_bbytes: 100,
            fpsh_cnt: 0,
            bpsh_cnt: 0,
            furg_cnt: 0,
            burg_cnt: 0,
            total_fhlen: 20,
            total_bhlen: 20,
        }
    }

    #[test]
    fn csv_sink_round_trips_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.csv");
        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.write(&sample_record()).unwrap();
            sink.flush().unwrap();
        }
        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.split(',').count(), 44);
        let row = lines.next().unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 44);
        assert_eq!(fields[0], "10.0.0.1");
        assert_eq!(fields[4], "6");
    }

    #[test]
    fn vec_sink_collects_records() {
        let mut sink = VecSink::new();
        sink.write(&sample_record()).unwrap();
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].srcip, "10.0.0.1");
    }
}
