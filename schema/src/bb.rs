use crate::{error::ProtocolError, wire::WireType};

/// Default nesting limit for [`ByteBuffer::skip`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A binary protocol byte buffer meant for reading.
///
/// All multi-byte integers and floats are big-endian, strings and binaries
/// carry a 4-byte length prefix.
///
/// ```
/// let mut bb = brine_thrift_schema::ByteBuffer::new(&[0, 0, 0, 3, 65, 110, 110, 0, 42]);
/// assert_eq!(bb.read_string().unwrap(), "Ann");
/// assert_eq!(bb.read_i16().unwrap(), 42);
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Upper bound for preallocating a container of `count` elements. A
    /// hostile count cannot make us allocate more than the input could hold.
    pub fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining())
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if len > self.remaining() {
            return Err(ProtocolError::UnexpectedEof {
                needed:    len,
                remaining: self.remaining(),
            });
        }
        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Try to read a boolean value (a single `0` or `1` byte).
    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.read_array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other)),
        }
    }

    /// Try to read a signed byte.
    pub fn read_byte(&mut self) -> Result<i8, ProtocolError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_double(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Read a 4-byte length or count, rejecting negative values.
    fn read_len(&mut self) -> Result<usize, ProtocolError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(ProtocolError::NegativeLength(len));
        }
        Ok(len as usize)
    }

    /// Try to read a length-prefixed byte sequence. The result aliases the
    /// underlying memory.
    pub fn read_binary_slice(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    pub fn read_binary(&mut self) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.read_binary_slice()?.to_vec())
    }

    /// Try to read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_binary_slice()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    pub fn read_wire_type(&mut self) -> Result<WireType, ProtocolError> {
        let tag = self.read_array::<1>()?[0];
        WireType::from_u8(tag).ok_or(ProtocolError::UnknownWireType(tag))
    }

    /// Read a field header. The stop marker yields `(WireType::Stop, 0)`
    /// without consuming a field id.
    pub fn read_field_header(&mut self) -> Result<(WireType, i16), ProtocolError> {
        let ty = self.read_wire_type()?;
        if ty == WireType::Stop {
            return Ok((ty, 0));
        }
        Ok((ty, self.read_i16()?))
    }

    /// Read a list header: element type and element count.
    pub fn read_list_header(&mut self) -> Result<(WireType, usize), ProtocolError> {
        let elem = self.read_wire_type()?;
        Ok((elem, self.read_len()?))
    }

    /// Sets share the list header layout.
    pub fn read_set_header(&mut self) -> Result<(WireType, usize), ProtocolError> {
        self.read_list_header()
    }

    /// Read a map header: key type, value type and entry count.
    pub fn read_map_header(&mut self) -> Result<(WireType, WireType, usize), ProtocolError> {
        let key = self.read_wire_type()?;
        let value = self.read_wire_type()?;
        Ok((key, value, self.read_len()?))
    }

    /// Skip over one value of type `ty`, descending into structs and
    /// containers at most `max_depth` levels deep.
    pub fn skip(&mut self, ty: WireType, max_depth: usize) -> Result<(), ProtocolError> {
        self.skip_at(ty, 0, max_depth)
    }

    fn skip_at(&mut self, ty: WireType, depth: usize, max_depth: usize) -> Result<(), ProtocolError> {
        let compound = matches!(
            ty,
            WireType::Struct | WireType::List | WireType::Set | WireType::Map
        );
        if compound && depth >= max_depth {
            return Err(ProtocolError::DepthLimitExceeded(max_depth));
        }
        match ty {
            WireType::Bool
            | WireType::Byte
            | WireType::I16
            | WireType::I32
            | WireType::I64
            | WireType::Double => {
                self.read_bytes(ty.fixed_size().unwrap_or_default())?;
            }
            WireType::String => {
                self.read_binary_slice()?;
            }
            WireType::Struct => loop {
                let (field_ty, _) = self.read_field_header()?;
                if field_ty == WireType::Stop {
                    break;
                }
                self.skip_at(field_ty, depth + 1, max_depth)?;
            },
            WireType::List | WireType::Set => {
                let (elem, count) = self.read_list_header()?;
                for _ in 0..count {
                    self.skip_at(elem, depth + 1, max_depth)?;
                }
            }
            WireType::Map => {
                let (key, value, count) = self.read_map_header()?;
                for _ in 0..count {
                    self.skip_at(key, depth + 1, max_depth)?;
                    self.skip_at(value, depth + 1, max_depth)?;
                }
            }
            WireType::Stop | WireType::Void => {
                return Err(ProtocolError::UnknownWireType(ty.as_u8()));
            }
        }
        Ok(())
    }
}

/// Check the element/key/value type announced by a non-empty container
/// header against the type the reader expects.
pub fn expect_wire_type(
    field_id: i16,
    expected: WireType,
    found: WireType,
    count: usize,
) -> Result<(), ProtocolError> {
    if count > 0 && expected != found {
        return Err(ProtocolError::WireTypeMismatch { field_id, expected, found });
    }
    Ok(())
}

#[test]
fn read_bool() {
    let read = |bytes| ByteBuffer::new(bytes).read_bool();
    assert!(matches!(read(&[]), Err(ProtocolError::UnexpectedEof { .. })));
    assert_eq!(read(&[0]), Ok(false));
    assert_eq!(read(&[1]), Ok(true));
    assert_eq!(read(&[2]), Err(ProtocolError::InvalidBool(2)));
}

#[test]
fn read_integers() {
    assert_eq!(ByteBuffer::new(&[0xff]).read_byte(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[0x01, 0x02]).read_i16(), Ok(0x0102));
    assert_eq!(ByteBuffer::new(&[0xff, 0xfe]).read_i16(), Ok(-2));
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 31]).read_i32(), Ok(31));
    assert_eq!(
        ByteBuffer::new(&[0x80, 0, 0, 0, 0, 0, 0, 0]).read_i64(),
        Ok(i64::MIN)
    );
    assert_eq!(
        ByteBuffer::new(&[0x3f, 0xf8, 0, 0, 0, 0, 0, 0]).read_double(),
        Ok(1.5)
    );
    assert_eq!(
        ByteBuffer::new(&[0, 0, 1]).read_i32(),
        Err(ProtocolError::UnexpectedEof { needed: 4, remaining: 3 })
    );
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[0, 0, 0, 0]), Ok(String::new()));
    assert_eq!(read(&[0, 0, 0, 2, 104, 105]), Ok("hi".to_string()));
    assert_eq!(read(&[0, 0, 0, 1, 0xff]), Err(ProtocolError::InvalidUtf8));
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff]), Err(ProtocolError::NegativeLength(-1)));
    assert!(matches!(read(&[0, 0, 0, 9, 1]), Err(ProtocolError::UnexpectedEof { .. })));
}

#[test]
fn read_headers() {
    let mut bb = ByteBuffer::new(&[11, 0, 7, 0, 15, 8, 0, 0, 0, 2, 13, 11, 8, 0, 0, 0, 1]);
    assert_eq!(bb.read_field_header(), Ok((WireType::String, 7)));
    assert_eq!(bb.read_field_header(), Ok((WireType::Stop, 0)));
    assert_eq!(bb.read_list_header(), Ok((WireType::I32, 2)));
    assert_eq!(bb.read_map_header(), Ok((WireType::String, WireType::I32, 1)));
    assert_eq!(bb.remaining(), 0);

    assert_eq!(
        ByteBuffer::new(&[5]).read_wire_type(),
        Err(ProtocolError::UnknownWireType(5))
    );
}

#[test]
fn skip_nested_values() {
    // struct { 1: list<i32> [1, 2], 2: map<string, struct {}> {"a": {}} }
    let data = [
        15, 0, 1, 8, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2,
        13, 0, 2, 11, 12, 0, 0, 0, 1, 0, 0, 0, 1, 97, 0,
        0, 99,
    ];
    let mut bb = ByteBuffer::new(&data);
    bb.skip(WireType::Struct, DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(bb.read_bytes(1), Ok(&[99u8][..]));
}

#[test]
fn skip_depth_limit() {
    // 100 nested lists of one list each.
    let mut data = Vec::new();
    for _ in 0..100 {
        data.extend_from_slice(&[15, 0, 0, 0, 1]);
    }
    let mut bb = ByteBuffer::new(&data);
    assert_eq!(
        bb.skip(WireType::List, 8),
        Err(ProtocolError::DepthLimitExceeded(8))
    );
}

#[test]
fn expect_wire_type_ignores_empty_containers() {
    assert_eq!(expect_wire_type(1, WireType::I32, WireType::Void, 0), Ok(()));
    assert_eq!(
        expect_wire_type(1, WireType::I32, WireType::I64, 2),
        Err(ProtocolError::WireTypeMismatch {
            field_id: 1,
            expected: WireType::I32,
            found:    WireType::I64,
        })
    );
}

/// A binary protocol byte buffer meant for writing.
///
/// ```
/// use brine_thrift_schema::{ByteBufferMut, WireType};
/// let mut bb = ByteBufferMut::new();
/// bb.write_field_header(WireType::I32, 2);
/// bb.write_i32(31);
/// bb.write_stop();
/// assert_eq!(bb.data(), [8, 0, 2, 0, 0, 0, 31, 0]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    pub fn with_capacity(capacity: usize) -> ByteBufferMut {
        ByteBufferMut { data: Vec::with_capacity(capacity) }
    }

    /// Consumes this buffer and returns the underlying backing store.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(if value { 1 } else { 0 });
    }

    pub fn write_byte(&mut self, value: i8) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write raw bytes without a length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    fn write_len(&mut self, len: usize) {
        self.write_i32(len as i32);
    }

    /// Write a length-prefixed byte sequence.
    pub fn write_binary(&mut self, value: &[u8]) {
        self.write_len(value.len());
        self.write_bytes(value);
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_binary(value.as_bytes());
    }

    pub fn write_field_header(&mut self, ty: WireType, id: i16) {
        self.data.push(ty.as_u8());
        self.write_i16(id);
    }

    pub fn write_list_header(&mut self, elem: WireType, count: usize) {
        self.data.push(elem.as_u8());
        self.write_len(count);
    }

    pub fn write_set_header(&mut self, elem: WireType, count: usize) {
        self.write_list_header(elem, count);
    }

    pub fn write_map_header(&mut self, key: WireType, value: WireType, count: usize) {
        self.data.push(key.as_u8());
        self.data.push(value.as_u8());
        self.write_len(count);
    }

    /// Write the stop marker that terminates a struct.
    pub fn write_stop(&mut self) {
        self.data.push(WireType::Stop.as_u8());
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_scalars() {
    assert_eq!(write_once(|bb| bb.write_bool(true)), [1]);
    assert_eq!(write_once(|bb| bb.write_byte(-1)), [0xff]);
    assert_eq!(write_once(|bb| bb.write_i16(0x0102)), [1, 2]);
    assert_eq!(write_once(|bb| bb.write_i32(-2)), [0xff, 0xff, 0xff, 0xfe]);
    assert_eq!(write_once(|bb| bb.write_i64(1)), [0, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(
        write_once(|bb| bb.write_double(1.5)),
        [0x3f, 0xf8, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn write_length_prefixed() {
    assert_eq!(write_once(|bb| bb.write_string("")), [0, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_string("Ann")), [0, 0, 0, 3, 65, 110, 110]);
    assert_eq!(write_once(|bb| bb.write_binary(&[9, 8])), [0, 0, 0, 2, 9, 8]);
}

#[test]
fn write_headers() {
    assert_eq!(write_once(|bb| bb.write_field_header(WireType::String, 1)), [11, 0, 1]);
    assert_eq!(
        write_once(|bb| bb.write_list_header(WireType::I32, 3)),
        [8, 0, 0, 0, 3]
    );
    assert_eq!(
        write_once(|bb| bb.write_map_header(WireType::String, WireType::List, 2)),
        [11, 15, 0, 0, 0, 2]
    );
    assert_eq!(write_once(|bb| bb.write_stop()), [0]);
}
