// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::Buf;
use bytes::Bytes;
use std::io::Cursor;
use std::string::FromUtf8Error;
use strum_macros::IntoStaticStr;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Arrays nested deeper than this are rejected instead of recursing further.
const MAX_NESTING_DEPTH: usize = 512;

/// Upper bound on the elements reserved up front for an array. Larger arrays grow as they
/// are parsed.
const MAX_ARRAY_PREALLOCATION: usize = 1024;

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("unknown RESP type: {}", as_char(.0))]
    InvalidDataType(u8),
    #[error("invalid length: {0}")]
    InvalidLength(String),
    #[error("invalid integer: {0}")]
    InvalidInteger(String),
    #[error("array nesting is too deep")]
    NestingTooDeep,
    #[error("invalid frame format; payload is not valid UTF-8")]
    InvalidUtf8,
}

/// A single RESP value.
///
/// RESP2 has two distinct null encodings, one for bulk strings (`$-1`) and one for arrays
/// (`*-1`). Both are kept as separate variants so that a value always serializes back to the
/// exact bytes it was parsed from.
#[derive(Clone, Debug, PartialEq, IntoStaticStr)]
pub enum Frame {
    #[strum(serialize = "simple string")]
    Simple(String),
    #[strum(serialize = "error")]
    Error(String),
    #[strum(serialize = "integer")]
    Integer(i64),
    #[strum(serialize = "bulk string")]
    Bulk(Bytes),
    #[strum(serialize = "null bulk string")]
    Null,
    #[strum(serialize = "null array")]
    NullArray,
    #[strum(serialize = "array")]
    Array(Vec<Frame>),
}

// Protocol specification: https://redis.io/docs/reference/protocol-spec/
impl Frame {
    /// Parses exactly one frame from `src`, leaving the cursor right after it.
    ///
    /// When the buffered data ends before the frame does, `Error::Incomplete` is returned and
    /// the cursor position is meaningless. Any other error leaves the cursor at the point the
    /// decode reached, which is where the caller should resume.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        parse_nested(src, 0)
    }

    /// Name of the frame kind, used in error replies and logs.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.serialize_into(&mut bytes);
        bytes
    }

    fn serialize_into(&self, dst: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => write_line(dst, DataType::SimpleString, &single_line(s)),
            Frame::Error(s) => write_line(dst, DataType::SimpleError, &single_line(s)),
            Frame::Integer(i) => write_line(dst, DataType::Integer, i.to_string().as_bytes()),
            // $<length>\r\n<data>\r\n
            Frame::Bulk(data) => {
                write_line(dst, DataType::BulkString, data.len().to_string().as_bytes());
                dst.extend_from_slice(data);
                dst.extend_from_slice(CRLF);
            }
            Frame::Null => write_line(dst, DataType::BulkString, b"-1"),
            Frame::NullArray => write_line(dst, DataType::Array, b"-1"),
            // *<number-of-elements>\r\n<element-1>...<element-n>
            Frame::Array(frames) => {
                write_line(dst, DataType::Array, frames.len().to_string().as_bytes());
                for frame in frames {
                    frame.serialize_into(dst);
                }
            }
        }
    }
}

fn parse_nested(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Frame, Error> {
    // The first byte in an RESP-serialized payload always identifies its type.
    // Subsequent bytes constitute the type's contents.
    let first_byte = get_byte(src)?;
    let data_type = DataType::try_from(first_byte)?;

    match data_type {
        DataType::SimpleString => {
            let line = get_line(src)?;
            Ok(Frame::Simple(String::from_utf8(line.to_vec())?))
        }
        DataType::SimpleError => {
            let line = get_line(src)?;
            Ok(Frame::Error(String::from_utf8(line.to_vec())?))
        }
        DataType::Integer => {
            let line = String::from_utf8(get_line(src)?.to_vec())?;

            // A line such as `:1 2` is not a list of integers, it is malformed.
            let mut tokens = line.split_whitespace();
            let integer = match (tokens.next(), tokens.next()) {
                (Some(token), None) => token.parse::<i64>().ok(),
                _ => None,
            };

            integer
                .map(Frame::Integer)
                .ok_or_else(|| Error::InvalidInteger(line.clone()))
        }
        DataType::BulkString => {
            let length = match get_length(src)? {
                None => return Ok(Frame::Null),
                Some(length) => length,
            };

            // The payload may itself contain CRLF, so it is read by length and the trailing
            // two bytes are skipped rather than searched for.
            if src.remaining() < length + CRLF.len() {
                return Err(Error::Incomplete);
            }

            let data = Bytes::copy_from_slice(&src.chunk()[..length]);
            src.advance(length + CRLF.len());

            Ok(Frame::Bulk(data))
        }
        DataType::Array => {
            let length = match get_length(src)? {
                None => return Ok(Frame::NullArray),
                Some(length) => length,
            };

            if depth >= MAX_NESTING_DEPTH {
                return Err(Error::NestingTooDeep);
            }

            let mut frames = Vec::with_capacity(array_capacity(length, src.remaining()));
            for _ in 0..length {
                frames.push(parse_nested(src, depth + 1)?);
            }

            Ok(Frame::Array(frames))
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

// Compact single-line rendering used in logs.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::NullArray => write!(f, "*-1"),
            Frame::Array(arr) => {
                write!(f, "[")?;
                for (i, frame) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", frame)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn as_char(byte: &u8) -> char {
    char::from(*byte)
}

// Every element takes at least three bytes (`:0\r\n` is the shortest), so a declared length
// is only trusted as far as the buffered bytes could back it.
fn array_capacity(length: usize, remaining: usize) -> usize {
    length
        .min(remaining / 3)
        .min(MAX_ARRAY_PREALLOCATION)
}

// Simple strings and errors end at the first CRLF, so line breaks in the payload are blanked.
fn single_line(s: &str) -> Vec<u8> {
    s.bytes()
        .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b })
        .collect()
}

fn write_line(dst: &mut Vec<u8>, data_type: DataType, payload: &[u8]) {
    dst.reserve(1 + payload.len() + CRLF.len());
    dst.push(u8::from(data_type));
    dst.extend_from_slice(payload);
    dst.extend_from_slice(CRLF);
}

/// Returns the bytes up to the next CRLF and moves the cursor past the CRLF.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = buf[start..]
        .windows(CRLF.len())
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

/// Reads a length header. `None` stands for the `-1` null marker.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, Error> {
    let line = get_line(src)?;
    let invalid = || Error::InvalidLength(String::from_utf8_lossy(line).into_owned());

    let length = std::str::from_utf8(line)
        .map_err(|_| invalid())?
        .parse::<i64>()
        .map_err(|_| invalid())?;

    match length {
        -1 => Ok(None),
        n if n < -1 => Err(invalid()),
        n => usize::try_from(n).map(Some).map_err(|_| invalid()),
    }
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        Error::InvalidUtf8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Result<Frame, Error> {
        let mut cursor = Cursor::new(data);
        Frame::parse(&mut cursor)
    }

    #[test]
    fn parse_simple_string_frame() {
        let frame = parse(b"+OK\r\n");

        assert!(matches!(frame, Ok(Frame::Simple(ref s)) if s == "OK"));
    }

    #[test]
    fn parse_simple_string_frame_empty() {
        assert_eq!(parse(b"+\r\n"), Ok(Frame::Simple(String::new())));
    }

    #[test]
    fn parse_simple_error_frame() {
        let frame = parse(b"-Error message\r\n");

        assert!(matches!(
            frame,
            Ok(Frame::Error(ref s)) if s == "Error message"
        ));
    }

    fn parse_integer_frame(data: &[u8], expected: i64) {
        let frame = parse(data);

        assert!(matches!(frame, Ok(Frame::Integer(i)) if i == expected));
    }

    #[test]
    fn parse_integer_frame_positive() {
        parse_integer_frame(b":1000\r\n", 1000);
    }

    #[test]
    fn parse_integer_frame_negative() {
        parse_integer_frame(b":-1000\r\n", -1000);
    }

    #[test]
    fn parse_integer_frame_zero() {
        parse_integer_frame(b":0\r\n", 0);
    }

    #[test]
    fn parse_integer_frame_positive_singned() {
        parse_integer_frame(b":+1000\r\n", 1000);
    }

    #[test]
    fn parse_integer_frame_bounds() {
        parse_integer_frame(b":9223372036854775807\r\n", i64::MAX);
        parse_integer_frame(b":-9223372036854775808\r\n", i64::MIN);
    }

    #[test]
    fn parse_integer_frame_multiple_tokens() {
        assert_eq!(
            parse(b":1 2\r\n"),
            Err(Error::InvalidInteger("1 2".to_string()))
        );
    }

    #[test]
    fn parse_integer_frame_not_a_number() {
        assert_eq!(
            parse(b":abc\r\n"),
            Err(Error::InvalidInteger("abc".to_string()))
        );
        assert_eq!(parse(b":\r\n"), Err(Error::InvalidInteger(String::new())));
    }

    #[test]
    fn parse_bulk_string_frame() {
        let frame = parse(b"$6\r\nfoobar\r\n");

        assert!(matches!(
            frame,
            Ok(Frame::Bulk(ref b)) if b == &Bytes::from("foobar")
        ));
    }

    #[test]
    fn parse_bulk_string_frame_empty() {
        let frame = parse(b"$0\r\n\r\n");

        assert!(matches!(
            frame,
            Ok(Frame::Bulk(ref b)) if b == &Bytes::from("")
        ));
    }

    #[test]
    fn parse_bulk_string_frame_with_crlf_in_payload() {
        let frame = parse(b"$8\r\nfoo\r\nbar\r\n");

        assert_eq!(frame, Ok(Frame::Bulk(Bytes::from("foo\r\nbar"))));
    }

    #[test]
    fn parse_bulk_string_frame_null() {
        let frame = parse(b"$-1\r\n");

        assert!(matches!(frame, Ok(Frame::Null)));
    }

    #[test]
    fn parse_bulk_string_frame_invalid_length() {
        assert_eq!(
            parse(b"$abc\r\nfoo\r\n"),
            Err(Error::InvalidLength("abc".to_string()))
        );
        assert_eq!(
            parse(b"$-2\r\n"),
            Err(Error::InvalidLength("-2".to_string()))
        );
    }

    #[test]
    fn parse_bulk_string_frame_incomplete() {
        assert_eq!(parse(b"$6\r\nfoo"), Err(Error::Incomplete));
        assert_eq!(parse(b"$6\r\nfoobar"), Err(Error::Incomplete));
        assert_eq!(parse(b"$6"), Err(Error::Incomplete));
    }

    #[test]
    fn parse_array_frame_empty() {
        let frame = parse(b"*0\r\n");

        assert!(matches!(frame, Ok(Frame::Array(ref a)) if a.is_empty()));
    }

    #[test]
    fn parse_array_frame() {
        let frame = parse(b"*2\r\n$5\r\nhello\r\n$5\r\nworld\r\n");

        assert!(matches!(
            frame,
            Ok(Frame::Array(ref a)) if a.len() == 2
        ));

        assert!(matches!(
            frame,
            Ok(Frame::Array(ref a)) if a[0] == Frame::Bulk(Bytes::from("hello"))
        ));

        assert!(matches!(
            frame,
            Ok(Frame::Array(ref a)) if a[1] == Frame::Bulk(Bytes::from("world"))
        ));
    }

    #[test]
    fn parse_array_frame_nested() {
        let frame = parse(b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Hello\r\n-World\r\n");

        assert!(matches!(
            frame,
            Ok(Frame::Array(ref a)) if a.len() == 2
        ));

        assert!(matches!(
            frame,
            Ok(Frame::Array(ref a)) if a[0] == Frame::Array(vec![
                Frame::Integer(1),
                Frame::Integer(2),
                Frame::Integer(3)
            ])
        ));

        assert!(matches!(
            frame,
            Ok(Frame::Array(ref a)) if a[1] == Frame::Array(vec![
                Frame::Simple("Hello".to_string()),
                Frame::Error("World".to_string())
            ])
        ));
    }

    #[test]
    fn parse_array_frame_null() {
        let frame = parse(b"*-1\r\n");

        assert!(matches!(frame, Ok(Frame::NullArray)));
    }

    #[test]
    fn parse_array_frame_null_in_the_middle() {
        let frame = parse(b"*3\r\n$5\r\nhello\r\n$-1\r\n$5\r\nworld\r\n");

        assert_eq!(
            frame,
            Ok(Frame::Array(vec![
                Frame::Bulk(Bytes::from("hello")),
                Frame::Null,
                Frame::Bulk(Bytes::from("world")),
            ]))
        );
    }

    #[test]
    fn parse_array_frame_huge_declared_length() {
        assert_eq!(parse(b"*9223372036854775807\r\n:1\r\n"), Err(Error::Incomplete));
    }

    #[test]
    fn parse_array_frame_huge_declared_length_with_large_payload() {
        let mut data = b"*900000000\r\n$500000000\r\n".to_vec();
        data.resize(data.len() + 4 * 1024 * 1024, b'x');

        assert_eq!(parse(&data), Err(Error::Incomplete));
    }

    #[test]
    fn array_capacity_is_bounded() {
        assert_eq!(array_capacity(2, 100), 2);
        assert_eq!(array_capacity(900_000_000, 10), 3);
        assert_eq!(array_capacity(900_000_000, 500_000_000), MAX_ARRAY_PREALLOCATION);
        assert_eq!(array_capacity(usize::MAX, 2), 0);
    }

    #[test]
    fn parse_array_frame_too_deep() {
        let data = b"*1\r\n".repeat(MAX_NESTING_DEPTH + 1);

        assert_eq!(parse(&data), Err(Error::NestingTooDeep));
    }

    #[test]
    fn parse_unknown_data_type() {
        let data = b"?foo\r\n";
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(Frame::parse(&mut cursor), Err(Error::InvalidDataType(b'?')));
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn parse_consecutive_frames() {
        let data = b"+OK\r\n:42\r\n$3\r\nfoo\r\n";
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(Frame::parse(&mut cursor), Ok(Frame::Simple("OK".to_string())));
        assert_eq!(Frame::parse(&mut cursor), Ok(Frame::Integer(42)));
        assert_eq!(Frame::parse(&mut cursor), Ok(Frame::Bulk(Bytes::from("foo"))));
        assert_eq!(Frame::parse(&mut cursor), Err(Error::Incomplete));
    }

    #[test]
    fn serialize_frames() {
        assert_eq!(Frame::Simple("OK".to_string()).serialize(), b"+OK\r\n");
        assert_eq!(
            Frame::Error("ERR unknown command: FOO".to_string()).serialize(),
            b"-ERR unknown command: FOO\r\n"
        );
        assert_eq!(Frame::Integer(-42).serialize(), b":-42\r\n");
        assert_eq!(Frame::Bulk(Bytes::from("Alice")).serialize(), b"$5\r\nAlice\r\n");
        assert_eq!(Frame::Bulk(Bytes::new()).serialize(), b"$0\r\n\r\n");
        assert_eq!(Frame::Null.serialize(), b"$-1\r\n");
        assert_eq!(Frame::NullArray.serialize(), b"*-1\r\n");
        assert_eq!(Frame::Array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn serialize_command_array() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("SET")),
            Frame::Bulk(Bytes::from("name")),
            Frame::Bulk(Bytes::from("Alice")),
        ]);

        assert_eq!(
            frame.serialize(),
            b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$5\r\nAlice\r\n"
        );
    }

    #[test]
    fn serialize_bulk_string_uses_byte_length() {
        let frame = Frame::Bulk(Bytes::from("héllo"));

        assert_eq!(frame.serialize(), "$6\r\nhéllo\r\n".as_bytes());
    }

    #[test]
    fn round_trip_values() {
        let frames = vec![
            Frame::Simple(String::new()),
            Frame::Error("ERR something".to_string()),
            Frame::Integer(i64::MIN),
            Frame::Bulk(Bytes::from_static(b"\r\n\x00binary")),
            Frame::Null,
            Frame::NullArray,
            Frame::Array(vec![
                Frame::Array(vec![]),
                Frame::NullArray,
                Frame::Array(vec![Frame::Integer(1), Frame::Null]),
            ]),
        ];

        for frame in frames {
            let bytes = frame.serialize();
            assert_eq!(parse(&bytes), Ok(frame));
        }
    }

    #[test]
    fn round_trip_bytes() {
        let inputs: Vec<&[u8]> = vec![
            b"*1\r\n$4\r\nPING\r\n",
            b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$5\r\nAlice\r\n",
            b"*2\r\n*0\r\n*-1\r\n",
            b"$-1\r\n",
            b":-7\r\n",
            b"-WRONGTYPE nope\r\n",
        ];

        for input in inputs {
            let frame = parse(input).unwrap();
            assert_eq!(frame.serialize(), input);
        }
    }

    #[test]
    fn random_input_never_panics() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let alphabet = b"+-:$*\r\n0123456789-abc";

        for _ in 0..10_000 {
            let len = rng.gen_range(0..48);
            let data: Vec<u8> = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            let mut cursor = Cursor::new(&data[..]);
            if Frame::parse(&mut cursor).is_ok() {
                assert!(cursor.position() as usize <= data.len());
            }
        }
    }

    #[test]
    fn serialize_blanks_line_breaks_in_simple_frames() {
        let frame = Frame::Error("ERR unknown command: X\r\n:1".to_string());
        let bytes = frame.serialize();

        assert_eq!(bytes, b"-ERR unknown command: X  :1\r\n");

        let mut cursor = Cursor::new(&bytes[..]);
        assert_eq!(
            Frame::parse(&mut cursor),
            Ok(Frame::Error("ERR unknown command: X  :1".to_string()))
        );
        assert_eq!(cursor.position() as usize, bytes.len());

        assert_eq!(
            Frame::Simple("a\nb".to_string()).serialize(),
            b"+a b\r\n"
        );
    }

    #[test]
    fn into_bytes() {
        let bytes: Vec<u8> = Frame::Array(vec![Frame::Integer(5), Frame::Null]).into();

        assert_eq!(bytes, b"*2\r\n:5\r\n$-1\r\n");
    }

    #[test]
    fn frame_kind() {
        assert_eq!(Frame::Integer(1).kind(), "integer");
        assert_eq!(Frame::Bulk(Bytes::new()).kind(), "bulk string");
        assert_eq!(Frame::NullArray.kind(), "null array");
    }
}
