//! Message sinks.

use std::io::Write;

use chrono::Local;

use crate::message::Message;

/// Consumer of decoded messages.
pub trait MessageSink {
    fn emit(&mut self, msg: &Message, crc_corrected: bool, rx_idx: u64);
}

/// Plain-text report printer.
pub struct Printer<W: Write> {
    out: W,
}

impl Printer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Printer {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Printer { out }
    }

    fn write_report(&mut self, msg: &Message, crc_corrected: bool, rx_idx: u64) -> std::io::Result<()> {
        let out = &mut self.out;
        writeln!(
            out,
            "\n[BEGIN_MESSAGE]----------------------------------------------------------\n"
        )?;
        writeln!(out, "RX_IDX: {}", rx_idx)?;
        if crc_corrected {
            writeln!(out, "CRC: Bad, corrected")?;
        } else {
            writeln!(out, "CRC: Correct")?;
        }
        writeln!(out, "Timestamp: {}", Local::now().format("%d/%m/%Y %H:%M"))?;
        writeln!(out, "ACARS mode: {} ", msg.mode)?;
        writeln!(out, "Message label: {}", msg.label)?;
        writeln!(out, "Aircraft reg: {}, flight id: {}", msg.address, msg.flight_id)?;
        writeln!(out, "Block id: {},  msg. no: {}", msg.block_id, msg.seq_no)?;
        writeln!(out, "Message content:-\n{}", msg.text)?;
        writeln!(
            out,
            "\n[END_MESSAGE ]------------------------------------------------------------\n"
        )?;
        out.flush()
    }
}

impl<W: Write> MessageSink for Printer<W> {
    fn emit(&mut self, msg: &Message, crc_corrected: bool, rx_idx: u64) {
        // a broken pipe on stdout is not worth tearing the pipeline down
        let _ = self.write_report(msg, crc_corrected, rx_idx);
    }
}
