use core::fmt;

use embedded_io::Write;
use log::warn;

/// Write one CRLF terminated diagnostic line, best effort.
pub fn emit<W: Write>(sink: &mut W, args: fmt::Arguments<'_>) {
    if let Err(e) = sink.write_fmt(args) {
        warn!("status line dropped: {:?}", e);
        return;
    }
    if let Err(e) = sink.write_all(b"\r\n").and_then(|_| sink.flush()) {
        warn!("status line truncated: {:?}", e);
    }
}

#[macro_export]
macro_rules! status {
    ($sink:expr, $($arg:tt)*) => {
        $crate::status::emit($sink, format_args!($($arg)*))
    };
}
