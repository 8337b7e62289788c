use super::checksum::SumDigest;
use super::PREAMBLE;

/// A trait for serializing frames. Everything on this wire is big-endian.
pub trait Serializer {
    type Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error>;

    // everything else can be written in terms of write_u8

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        for b in val.iter() {
            self.write_u8(*b)?;
        }
        Ok(())
    }

    fn write_be_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        self.write_bytes(&val.to_be_bytes())
    }

    fn write_be_i16(&mut self, val: i16) -> Result<(), Self::Error> {
        self.write_be_u16(val as u16)
    }

    fn write_be_u32(&mut self, val: u32) -> Result<(), Self::Error> {
        self.write_bytes(&val.to_be_bytes())
    }

    fn write_be_f32(&mut self, val: f32) -> Result<(), Self::Error> {
        self.write_be_u32(val.to_bits())
    }
}

impl<S> Serializer for &mut S
where
    S: Serializer,
{
    type Error = S::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        (*self).write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        (*self).write_bytes(val)
    }
}

/// Wrap an [embedded_io::Write] to become a Serializer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerWrap<T> {
    inner: T,
}

impl<T> SerializerWrap<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn done(self) -> T {
        self.inner
    }
}

impl<T> Serializer for SerializerWrap<T>
where
    T: embedded_io::Write,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.inner.write_all(&[val])
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(val)
    }
}

/// A serializer that collects into a [Vec].
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerVec {
    data: Vec<u8>,
}

impl SerializerVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(self) -> Vec<u8> {
        self.data
    }
}

impl Serializer for SerializerVec {
    type Error = core::convert::Infallible;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.data.push(val);
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.data.extend_from_slice(val);
        Ok(())
    }
}

/// A serializer that also computes the checksum on the side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerChecksum<T> {
    digest: SumDigest,
    inner: T,
}

impl<T> SerializerChecksum<T> {
    pub fn new(inner: T) -> Self {
        Self {
            digest: SumDigest::new(),
            inner,
        }
    }

    pub fn finalize(self) -> (u16, T) {
        (self.digest.finalize(), self.inner)
    }
}

impl<T> Serializer for SerializerChecksum<T>
where
    T: Serializer,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.digest.update(&[val]);
        self.inner.write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.digest.update(val);
        self.inner.write_bytes(val)
    }
}

/// Serialize a whole frame: preamble, type, address, payload, checksum.
pub fn write_frame<S>(ser: &mut S, type_byte: u8, address: u8, payload: &[u8]) -> Result<(), S::Error>
where
    S: Serializer,
{
    let mut sum = SerializerChecksum::new(ser);
    sum.write_bytes(&PREAMBLE)?;
    sum.write_u8(type_byte)?;
    sum.write_u8(address)?;
    sum.write_bytes(payload)?;
    let (checksum, ser) = sum.finalize();
    ser.write_be_u16(checksum)
}

/// Build a frame into a fresh buffer.
pub fn build_request_frame(type_byte: u8, address: u8, payload: &[u8]) -> Vec<u8> {
    let mut ser = SerializerVec::new();
    write_frame(&mut ser, type_byte, address, payload).unwrap_or_else(|e| match e {});
    ser.done()
}
