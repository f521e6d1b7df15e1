//! Tether command line interface.

use std::{
    io::{self, Write},
    process, thread,
    time::Duration,
};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::{style, Term};
use log::{debug, trace, LevelFilter};
use simplelog::*;

use tether::{self as tt, DataBits, KeyType, Parity, SerialOpener, StopBits, Supervisor};

fn main() {
    println!("[TT] tether v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Tether is a minimal serial console. It prints whatever the board \
            on the other side of the serial line sends, and forwards every key \
            typed in the terminal to the board, including arrows and control \
            keys.\n\
            \n\
            When the line breaks, for example because the USB cable was \
            unplugged or the board was reset, tether keeps trying to open the \
            port again every second with the same settings and resumes as soon \
            as the device is back.\n\
            \n\
            Press Ctrl+\\ to quit.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the serial tty device to use")
                .long_help(
                    "the serial tty device to use; tether waits for this same \
                     path to come back when the device is unplugged.",
                )
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .required(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .long_help("serial baud rate, re-applied on every reconnect")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("DATA_BITS")
                .help("number of bits per character")
                .short("-d")
                .long("--data-bits")
                .takes_value(true)
                .possible_values(&["5", "6", "7", "8"])
                .default_value("8")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STOP_BITS")
                .help("number of stop bits per byte")
                .short("-s")
                .long("--stop-bits")
                .takes_value(true)
                .possible_values(&["1", "2"])
                .default_value("1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PARITY")
                .help("parity checking protocol")
                .short("-p")
                .long("--parity")
                .takes_value(true)
                .possible_values(&["none", "odd", "even"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'tether -v -v -v' or 'tether -vvv' vs 'tether -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .expect("Failed to install the logger!");

    trace!("{:#?}", matches);

    // Arguments ===============================================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value with either be what the user input at runtime
    // or the default value. `DEVICE_TTY` is required and enforced by clap.

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a numeric value",
            style("error").red(),
            style("baud-rate").cyan()
        );
        println!(
            "   {} `{}` is not a valid value",
            style("-->").cyan(),
            style(matches.value_of("BAUD_RATE").unwrap()).on_red()
        );
        process::exit(-1);
    });

    let data_bits = match matches.value_of("DATA_BITS").unwrap() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        _ => unreachable!(),
    };

    let stop_bits = match matches.value_of("STOP_BITS").unwrap() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        _ => unreachable!(),
    };

    let parity = match matches.value_of("PARITY").unwrap() {
        "none" => Parity::None,
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => unreachable!(),
    };

    let settings = tt::SettingsBuilder::new(matches.value_of("DEVICE_TTY").unwrap())
        .baud_rate(baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .finalize();

    // END - Arguments =========================================================

    // The terminal spends most of its time in raw mode while waiting for keys,
    // with no output post-processing.
    let supervisor = match Supervisor::connect_with(
        settings,
        SerialOpener,
        CrLf::new(io::stdout()),
        CrLf::new(Term::stderr()),
    ) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            println!("{} {}", style("[TT] 💥").red(), e);
            process::exit(1);
        }
    };

    let runner = supervisor.clone();
    let supervision = thread::Builder::new()
        .name("tether-supervisor".into())
        .spawn(move || runner.run())
        .expect("Failed to start the supervision thread!");

    // Terminal loop: every key goes to the board, until Ctrl+\.
    loop {
        let key = tt::read_key();
        match key.kind {
            None => {
                // No terminal to read from right now, don't spin on it
                thread::sleep(Duration::from_millis(100));
            }
            Some(KeyType::CtrlBackslash) => break,
            Some(kind) => {
                trace!("key {:?} {:?}", kind, key.raw);
                supervisor.write(key.bytes());
            }
        }
    }

    supervisor.stop();
    let exit_code = supervision.join().unwrap_or(1);
    debug!("exit code: {}", exit_code);
    println!();
    process::exit(exit_code.into());
}

/// Turns bare line feeds into CR LF on the way to the terminal. Line endings
/// that already have their carriage return are left alone.
struct CrLf<W> {
    inner: W,
    last: u8,
}

impl<W: Write> CrLf<W> {
    fn new(inner: W) -> Self {
        CrLf { inner, last: 0 }
    }
}

impl<W: Write> Write for CrLf<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len() + buf.len() / 8);
        for &byte in buf {
            if byte == b'\n' && self.last != b'\r' {
                out.push(b'\r');
            }
            out.push(byte);
            self.last = byte;
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_line_feeds_get_a_carriage_return() {
        let mut out = CrLf::new(Vec::new());
        out.write_all(b"U-Boot\n=> ").unwrap();
        out.write_all(b"ok\r\n").unwrap();
        assert_eq!(out.inner, b"U-Boot\r\n=> ok\r\n".to_vec());
    }

    #[test]
    fn carriage_return_split_across_writes() {
        let mut out = CrLf::new(Vec::new());
        out.write_all(b"line\r").unwrap();
        out.write_all(b"\nnext\n\n").unwrap();
        assert_eq!(out.inner, b"line\r\nnext\r\n\r\n".to_vec());
    }
}
