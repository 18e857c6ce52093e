use std::fmt;
use std::io::Write;
use std::sync::mpsc::Sender;

use crate::nmea::gga_sentence;
use crate::telemetry::PositionSample;


/**
 * The sink has permanently lost the ability to accept samples.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct SinkError(pub String);


impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Publishes simulated positions to whatever consumes them.
pub trait PositionSink {
    /**
     * Must not block for longer than a tick. An error stops the run; it is
     * never retried.
     */
    fn publish(&mut self, sample: &PositionSample) -> Result<(), SinkError>;
}


/**
 * Writes every sample to the log.
 */
pub struct LogSink;

impl PositionSink for LogSink {
    fn publish(&mut self, sample: &PositionSample) -> Result<(), SinkError> {
        info!(
            "Position {:.6}, {:.6} at {}",
            sample.latitude,
            sample.longitude,
            sample.timestamp.format("%H:%M:%S%.3f"));
        Ok(())
    }
}


/**
 * Queues samples on a channel. The channel is unbounded, so publishing never
 * blocks the tick.
 */
pub struct ChannelSink {
    sample_tx: Sender<PositionSample>,
}

impl ChannelSink {
    pub fn new(sample_tx: Sender<PositionSample>) -> ChannelSink {
        ChannelSink {
            sample_tx: sample_tx,
        }
    }
}

impl PositionSink for ChannelSink {
    fn publish(&mut self, sample: &PositionSample) -> Result<(), SinkError> {
        match self.sample_tx.send(*sample) {
            Ok(_) => Ok(()),
            Err(_) => Err(SinkError("sample receiver has been dropped".to_string())),
        }
    }
}


/**
 * Emits one GGA sentence per sample, e.g. to stdout or a pseudo terminal.
 */
pub struct NmeaSink<W: Write> {
    writer: W,
}

impl<W: Write> NmeaSink<W> {
    pub fn new(writer: W) -> NmeaSink<W> {
        NmeaSink {
            writer: writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PositionSink for NmeaSink<W> {
    fn publish(&mut self, sample: &PositionSample) -> Result<(), SinkError> {
        let sentence = match gga_sentence(sample) {
            Ok(sentence) => sentence,
            Err(e) => return Err(SinkError(format!("Unable to format NMEA sentence: {}", e))),
        };
        match self.writer.write_all(sentence.as_bytes()).and_then(|_| self.writer.flush()) {
            Ok(_) => Ok(()),
            Err(e) => Err(SinkError(format!("Unable to write NMEA sentence: {}", e))),
        }
    }
}
