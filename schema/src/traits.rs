use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    error::ProtocolError,
    wire::STOP_LEN,
};

/// Implemented by every generated struct, union and exception.
///
/// `encoded_len` and `write` agree on which fields are emitted, so
/// `encoded_len()` always equals the byte count `write` returns.
pub trait ThriftStruct: Sized {
    /// Exact number of bytes `write` produces.
    fn encoded_len(&self) -> usize;

    /// Writes the struct, stop marker included, and returns the byte count.
    fn write(&self, out: &mut ByteBufferMut) -> usize;

    /// Reads a struct nested `depth` structs below the outermost one.
    /// Generated code fails with `DepthLimitExceeded` once `depth` reaches
    /// the limit it was generated with.
    fn read_at(bb: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError>;

    fn read(bb: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Self::read_at(bb, 0)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = ByteBufferMut::with_capacity(self.encoded_len());
        self.write(&mut out);
        out.data()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::read(&mut ByteBuffer::new(bytes))
    }
}

/// Writes `value`, or only a stop marker when the boxed struct is unset.
pub fn write_struct_or_stop<T: ThriftStruct>(value: Option<&T>, out: &mut ByteBufferMut) -> usize {
    match value {
        Some(value) => value.write(out),
        None => {
            out.write_stop();
            STOP_LEN
        }
    }
}

pub fn struct_or_stop_len<T: ThriftStruct>(value: Option<&T>) -> usize {
    value.map_or(STOP_LEN, ThriftStruct::encoded_len)
}
