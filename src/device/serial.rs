//! Serial port devices backed by `serialport`.

use std::io::{self, Read, Write};

use log::{debug, info};
use serialport::{FlowControl, SerialPort};

use super::{Device, Opener};
use crate::{
    error::{Error, Result},
    settings::Settings,
};

//==============================================================================
// Public Interface
//==============================================================================

/// Opens real serial ports.
///
/// `serialport` puts the line in raw mode (no echo, no line discipline) as
/// part of opening it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl Opener for SerialOpener {
    fn open(&self, settings: &Settings) -> Result<Box<dyn Device>> {
        let path = settings.path.as_str();
        let mut port = serialport::new(path, settings.baud_rate)
            .data_bits(settings.data_bits)
            .stop_bits(settings.stop_bits)
            .parity(settings.parity)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| Error::open(path, e))?;

        // Re-apply the line parameters explicitly. Some drivers come back from
        // a re-plug with their own defaults and ignore what was passed to the
        // builder.
        configure(port.as_mut(), settings).map_err(|e| Error::open(path, e))?;

        let actual = port.baud_rate().map_err(|e| Error::open(path, e))?;
        if actual != settings.baud_rate {
            return Err(Error::BaudRate {
                path: path.to_owned(),
                requested: settings.baud_rate,
                actual,
            });
        }

        info!("Connected to {} at {} baud", path, actual);
        debug!("data_bits    : {:#?}", port.data_bits());
        debug!("stop_bits    : {:#?}", port.stop_bits());
        debug!("parity       : {:#?}", port.parity());

        Ok(Box::new(SerialDevice { port }))
    }
}

//==============================================================================
// Private stuff
//==============================================================================

fn configure(port: &mut dyn SerialPort, settings: &Settings) -> serialport::Result<()> {
    port.set_baud_rate(settings.baud_rate)?;
    port.set_data_bits(settings.data_bits)?;
    port.set_stop_bits(settings.stop_bits)?;
    port.set_parity(settings.parity)?;
    port.set_flow_control(FlowControl::None)?;
    port.set_timeout(settings.read_timeout)
}

struct SerialDevice {
    port: Box<dyn SerialPort>,
}

impl Read for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Device for SerialDevice {
    fn try_clone_device(&self) -> io::Result<Box<dyn Device>> {
        let port = self.port.try_clone()?;
        Ok(Box::new(SerialDevice { port }))
    }
}
