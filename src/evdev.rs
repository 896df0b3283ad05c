use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::path::Path;

use byteorder::{ByteOrder, NativeEndian};

use crate::err::{CodecError, DockError};

/// Size of one `struct input_event` as the kernel writes it: a `timeval` of two
/// 64-bit fields, then type, code and value.
pub const EVENT_SIZE: usize =
    mem::size_of::<i64>() * 2 + mem::size_of::<u16>() * 2 + mem::size_of::<i32>();

/// One decoded evdev record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    seconds: i64,
    nanoseconds: i64,
    event_type: u16,
    event_code: u16,
    event_value: i32,
}

impl InputEvent {
    pub fn new(seconds: i64, nanoseconds: i64, event_type: u16, event_code: u16, event_value: i32) -> Self {
        InputEvent {
            seconds,
            nanoseconds,
            event_type,
            event_code,
            event_value,
        }
    }

    /// Reinterpret exactly `EVENT_SIZE` bytes in host byte order.
    ///
    /// Fails if `raw` has any other length, or if the host's `struct input_event`
    /// is not laid out the way this build expects (32-bit `timeval` targets).
    /// Field values are passed through unchecked.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        let host = mem::size_of::<libc::input_event>();
        if host != EVENT_SIZE {
            return Err(CodecError::Layout(host));
        }
        if raw.len() != EVENT_SIZE {
            return Err(CodecError::Length(raw.len()));
        }
        Ok(InputEvent {
            seconds: NativeEndian::read_i64(&raw[0..8]),
            nanoseconds: NativeEndian::read_i64(&raw[8..16]),
            event_type: NativeEndian::read_u16(&raw[16..18]),
            event_code: NativeEndian::read_u16(&raw[18..20]),
            event_value: NativeEndian::read_i32(&raw[20..24]),
        })
    }

    pub fn encode(&self) -> [u8; EVENT_SIZE] {
        let mut buf = [0; EVENT_SIZE];
        NativeEndian::write_i64(&mut buf[0..8], self.seconds);
        NativeEndian::write_i64(&mut buf[8..16], self.nanoseconds);
        NativeEndian::write_u16(&mut buf[16..18], self.event_type);
        NativeEndian::write_u16(&mut buf[18..20], self.event_code);
        NativeEndian::write_i32(&mut buf[20..24], self.event_value);
        buf
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Sub-second part of the timestamp, as the kernel delivered it.
    pub fn nanoseconds(&self) -> i64 {
        self.nanoseconds
    }

    pub fn event_type(&self) -> u16 {
        self.event_type
    }

    pub fn event_code(&self) -> u16 {
        self.event_code
    }

    pub fn event_value(&self) -> i32 {
        self.event_value
    }
}

/// Blocking stream of events read from an input device node.
///
/// Every pull waits until the kernel hands over a full record. A short read or a
/// read error is yielded once and ends the stream; reopen the device to start over.
pub struct EvdevStream<R> {
    reader: R,
    done: bool,
}

impl EvdevStream<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DockError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DockError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(EvdevStream::new(file))
    }
}

impl<R: Read> EvdevStream<R> {
    pub fn new(reader: R) -> Self {
        EvdevStream {
            reader,
            done: false,
        }
    }

    fn read_event(&mut self) -> Result<InputEvent, DockError> {
        let mut buf = [0; EVENT_SIZE];
        let mut filled = 0;
        while filled < EVENT_SIZE {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => return Err(DockError::ShortRead(filled)),
                Ok(sz) => filled += sz,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DockError::Read(e)),
            }
        }
        Ok(InputEvent::decode(&buf)?)
    }
}

impl<R: Read> Iterator for EvdevStream<R> {
    type Item = Result<InputEvent, DockError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let event = self.read_event();
        if event.is_err() {
            self.done = true;
        }
        Some(event)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use byteorder::{NativeEndian, WriteBytesExt};
    use std::io::Cursor;

    fn raw_event(sec: i64, nsec: i64, ty: u16, code: u16, value: i32) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.write_i64::<NativeEndian>(sec).unwrap();
        raw.write_i64::<NativeEndian>(nsec).unwrap();
        raw.write_u16::<NativeEndian>(ty).unwrap();
        raw.write_u16::<NativeEndian>(code).unwrap();
        raw.write_i32::<NativeEndian>(value).unwrap();
        raw
    }

    #[test]
    fn test_event_size_matches_kernel_struct() {
        assert_eq!(EVENT_SIZE, 24);
        assert_eq!(mem::size_of::<libc::input_event>(), EVENT_SIZE);
    }

    #[test]
    fn test_decode_field_order() {
        let event = InputEvent::decode(&raw_event(1_380_000_000, 123_456, 5, 5, 1)).unwrap();
        assert_eq!(event.seconds(), 1_380_000_000);
        assert_eq!(event.nanoseconds(), 123_456);
        assert_eq!(event.event_type(), 5);
        assert_eq!(event.event_code(), 5);
        assert_eq!(event.event_value(), 1);
    }

    #[test]
    fn test_decode_boundary_values() {
        let cases = [
            (0, 0, 0, 0, 0),
            (i64::MIN, i64::MIN, u16::MIN, u16::MIN, i32::MIN),
            (i64::MAX, i64::MAX, u16::MAX, u16::MAX, i32::MAX),
            (-1, 999_999, 0x1f, 0x2ff, -1),
        ];
        for &(sec, nsec, ty, code, value) in cases.iter() {
            let raw = raw_event(sec, nsec, ty, code, value);
            let event = InputEvent::decode(&raw).unwrap();
            assert_eq!(event, InputEvent::new(sec, nsec, ty, code, value));
            assert_eq!(&event.encode()[..], &raw[..]);
        }
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let raw = raw_event(0, 0, 5, 5, 1);
        assert_eq!(
            InputEvent::decode(&raw[..EVENT_SIZE - 1]),
            Err(CodecError::Length(EVENT_SIZE - 1))
        );
        let mut long = raw.clone();
        long.push(0);
        assert_eq!(InputEvent::decode(&long), Err(CodecError::Length(EVENT_SIZE + 1)));
        assert_eq!(InputEvent::decode(&[]), Err(CodecError::Length(0)));
    }

    #[test]
    fn test_stream_yields_events_in_order() {
        let mut raw = raw_event(1, 0, 5, 5, 1);
        raw.extend(raw_event(2, 0, 1, 1, 0));
        let events = EvdevStream::new(Cursor::new(raw))
            .take(2)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(events[0], InputEvent::new(1, 0, 5, 5, 1));
        assert_eq!(events[1], InputEvent::new(2, 0, 1, 1, 0));
    }

    #[test]
    fn test_stream_short_read_terminates() {
        let mut raw = raw_event(1, 0, 5, 5, 1);
        raw.extend(&raw_event(2, 0, 5, 5, 0)[..10]);
        let mut stream = EvdevStream::new(Cursor::new(raw));
        assert!(stream.next().unwrap().is_ok());
        match stream.next() {
            Some(Err(DockError::ShortRead(10))) => (),
            other => panic!("expected short read, got {:?}", other),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_stream_empty_device() {
        let mut stream = EvdevStream::new(Cursor::new(Vec::new()));
        match stream.next() {
            Some(Err(DockError::ShortRead(0))) => (),
            other => panic!("expected short read, got {:?}", other),
        }
        assert!(stream.next().is_none());
    }

    struct Trickle(Vec<u8>, usize);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.1 % 2 == 0 {
                self.1 += 1;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.1 += 1;
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn test_stream_reassembles_partial_reads() {
        let raw = raw_event(7, 8, 5, 5, 0);
        let mut stream = EvdevStream::new(Trickle(raw, 0));
        assert_eq!(stream.next().unwrap().unwrap(), InputEvent::new(7, 8, 5, 5, 0));
    }

    #[test]
    fn test_stream_read_error_terminates() {
        struct Gone;
        impl Read for Gone {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from_raw_os_error(libc::ENODEV))
            }
        }
        let mut stream = EvdevStream::new(Gone);
        match stream.next() {
            Some(Err(DockError::Read(_))) => (),
            other => panic!("expected read error, got {:?}", other),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_open_missing_device() {
        match EvdevStream::open("/nonexistent/dev/input/event99") {
            Err(DockError::Open { .. }) => (),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("opened a missing device"),
        }
    }
}
