// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the `BinaryEncoder` trait and helpers for reading and writing of scalar values and
//! other primitives.

use std::{
    fmt::Debug,
    io::{self, Cursor, Read, Result, Write},
    sync::Arc,
};

use byteorder::{ByteOrder, LittleEndian};
use chrono::Duration;

use crate::{
    sync::Mutex,
    types::{constants, status_codes::StatusCode, type_registry::TypeRegistry},
};

pub type EncodingResult<T> = std::result::Result<T, StatusCode>;

/// Depth lock holds a reference on the depth gauge. The drop ensures impl that the reference is
/// decremented even if there is a panic unwind.
#[derive(Debug)]
pub struct DepthLock {
    depth_gauge: Arc<Mutex<DepthGauge>>,
}

impl Drop for DepthLock {
    fn drop(&mut self) {
        let mut dg = trace_lock!(self.depth_gauge);
        if dg.current_depth > 0 {
            dg.current_depth -= 1;
        }
    }
}

impl DepthLock {
    /// The depth lock tests if the depth can increment and then obtains a lock on it.
    /// The lock will decrement the depth when it drops to ensure proper behaviour during unwinding.
    pub fn obtain(depth_gauge: Arc<Mutex<DepthGauge>>) -> EncodingResult<DepthLock> {
        let mut dg = trace_lock!(depth_gauge);
        if dg.current_depth >= dg.max_depth {
            warn!(
                "Decoding in stream aborted due maximum recursion depth {} being reached",
                dg.max_depth
            );
            Err(StatusCode::BadEncodingLimitsExceeded)
        } else {
            dg.current_depth += 1;
            drop(dg);
            Ok(Self { depth_gauge })
        }
    }
}

/// Depth gauge is used on potentially recursive structures like Variant, ExtensionObject,
/// DiagnosticInfo and structures during decoding to limit the depth the decoder will go before
/// giving up.
#[derive(Debug)]
pub struct DepthGauge {
    /// Maximum decoding depth for recursive elements. Triggers when current depth equals max depth.
    pub(crate) max_depth: usize,
    /// Current decoding depth for recursive elements.
    pub(crate) current_depth: usize,
}

impl Default for DepthGauge {
    fn default() -> Self {
        Self::new(constants::MAX_DECODING_DEPTH)
    }
}

impl DepthGauge {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            current_depth: 0,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn current_depth(&self) -> usize {
        self.current_depth
    }
}

/// Remembers the structure field that a decode failed in. Fields are recorded innermost first
/// as the error propagates outwards, producing a dotted path such as `Outer.Inner.Value`.
#[derive(Debug, Default)]
pub struct DecodeTrail {
    failed_field: Option<String>,
}

impl DecodeTrail {
    pub fn record_field(&mut self, name: &str) {
        self.failed_field = Some(match self.failed_field.take() {
            Some(inner) => format!("{}.{}", name, inner),
            None => name.to_string(),
        });
    }

    pub fn failed_field(&self) -> Option<&str> {
        self.failed_field.as_deref()
    }

    pub fn clear(&mut self) {
        self.failed_field = None;
    }
}

#[derive(Clone, Debug)]
pub struct DecodingOptions {
    /// Time offset between the client and the server. Decoded date times are adjusted by it.
    pub client_offset: Duration,
    /// Maximum size of a message in bytes. 0 means no limit.
    pub max_message_size: usize,
    /// Maximum length in bytes (not chars!) of a string. 0 actually means 0, i.e. no string permitted
    pub max_string_length: usize,
    /// Maximum length in bytes of a byte string. 0 actually means 0, i.e. no byte string permitted
    pub max_byte_string_length: usize,
    /// Maximum number of array elements. 0 actually means 0, i.e. no array permitted
    pub max_array_length: usize,
    /// When set, extension objects whose type is in the registry are decoded into their concrete
    /// value straight away. Unknown types always stay as raw bodies.
    pub decode_extension_objects: bool,
    /// Decoding depth gauge is used to check for recursion
    pub decoding_depth_gauge: Arc<Mutex<DepthGauge>>,
    /// Records which structure field a failure happened in
    pub decode_trail: Arc<Mutex<DecodeTrail>>,
    /// Registry used to resolve extension objects and named structures
    pub type_registry: Arc<TypeRegistry>,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        DecodingOptions {
            client_offset: Duration::zero(),
            max_message_size: constants::MAX_MESSAGE_SIZE,
            max_string_length: constants::MAX_STRING_LENGTH,
            max_byte_string_length: constants::MAX_BYTE_STRING_LENGTH,
            max_array_length: constants::MAX_ARRAY_LENGTH,
            decode_extension_objects: true,
            decoding_depth_gauge: Arc::new(Mutex::new(DepthGauge::default())),
            decode_trail: Arc::new(Mutex::new(DecodeTrail::default())),
            type_registry: TypeRegistry::global(),
        }
    }
}

impl DecodingOptions {
    /// For test only. Having a separate function makes it easier to control calls to DecodingOptions::default().
    #[cfg(test)]
    pub fn test() -> Self {
        Self::default()
    }

    /// Default limits but resolving types against the supplied registry instead of the global one.
    pub fn with_registry(type_registry: Arc<TypeRegistry>) -> Self {
        DecodingOptions {
            type_registry,
            ..Default::default()
        }
    }

    /// Sets the maximum decoding depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.decoding_depth_gauge = Arc::new(Mutex::new(DepthGauge::new(max_depth)));
        self
    }

    /// Returns a copy of these options with the same limits and registry but with a fresh depth
    /// gauge and decode trail, so one decode call cannot observe the state of another.
    pub fn per_call(&self) -> Self {
        let max_depth = trace_lock!(self.decoding_depth_gauge).max_depth;
        DecodingOptions {
            decoding_depth_gauge: Arc::new(Mutex::new(DepthGauge::new(max_depth))),
            decode_trail: Arc::new(Mutex::new(DecodeTrail::default())),
            ..self.clone()
        }
    }

    pub fn max_depth(&self) -> usize {
        trace_lock!(self.decoding_depth_gauge).max_depth
    }

    pub fn depth_lock(&self) -> EncodingResult<DepthLock> {
        DepthLock::obtain(self.decoding_depth_gauge.clone())
    }

    /// Notes that decoding failed inside the named field
    pub fn record_failed_field(&self, name: &str) {
        trace_lock!(self.decode_trail).record_field(name);
    }

    pub fn failed_field(&self) -> Option<String> {
        trace_lock!(self.decode_trail)
            .failed_field()
            .map(|f| f.to_string())
    }

    /// Forgets a recorded field after a failure that was recovered from
    pub fn clear_failed_field(&self) {
        trace_lock!(self.decode_trail).clear();
    }
}

/// OPC UA Binary Encoding interface. Anything that encodes to binary must implement this. It provides
/// functions to calculate the size in bytes of the struct (for allocating memory), encoding to a stream
/// and decoding from a stream.
pub trait BinaryEncoder<T> {
    /// Returns the exact byte length of the structure as it would be if `encode` were called.
    /// This may be called prior to writing to ensure the correct amount of space is available.
    fn byte_len(&self) -> usize;
    /// Encodes the instance to the write stream.
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize>;
    /// Decodes an instance from the read stream. The decoding options contains restrictions set by
    /// the caller on the length of strings, arrays etc. If these limits are exceeded the
    /// implementation should return with a `BadEncodingLimitsExceeded` as soon as possible.
    fn decode<S: Read + ?Sized>(stream: &mut S, decoding_options: &DecodingOptions)
        -> EncodingResult<T>;

    // Convenience method for encoding a message straight into an array of bytes. It is preferable to reuse buffers than
    // to call this so it should be reserved for tests and trivial code.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::with_capacity(self.byte_len()));
        let _ = self.encode(&mut buffer);
        buffer.into_inner()
    }
}

/// Converts an IO encoding error (and logs when in error) into an EncodingResult
pub fn process_encode_io_result(result: Result<usize>) -> EncodingResult<usize> {
    result.map_err(|err| {
        trace!("Encoding error - {:?}", err);
        StatusCode::BadEncodingError
    })
}

/// Converts an IO decoding error (and logs when in error) into an EncodingResult. Running out of
/// input is reported as `BadEndOfStream`, anything else as `BadDecodingError`.
pub fn process_decode_io_result<T>(result: Result<T>) -> EncodingResult<T>
where
    T: Debug,
{
    result.map_err(|err| {
        trace!("Decoding error - {:?}", err);
        if err.kind() == io::ErrorKind::UnexpectedEof {
            StatusCode::BadEndOfStream
        } else {
            StatusCode::BadDecodingError
        }
    })
}

/// Reads an array of the encoded type from a stream, preserving distinction between null array and empty array
pub fn read_array<S: Read + ?Sized, T: BinaryEncoder<T>>(
    stream: &mut S,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Option<Vec<T>>> {
    match read_array_length(stream, decoding_options)? {
        None => Ok(None),
        Some(len) => {
            let mut values: Vec<T> = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(T::decode(stream, decoding_options)?);
            }
            Ok(Some(values))
        }
    }
}

/// Writes an array length prefix. Lengths that do not fit the signed 32-bit prefix are an
/// encoding error.
pub fn write_array_length<S: Write + ?Sized>(stream: &mut S, len: usize) -> EncodingResult<usize> {
    let len = i32::try_from(len).map_err(|_| {
        error!("Array length {} is too large to encode", len);
        StatusCode::BadEncodingError
    })?;
    write_i32(stream, len)
}

/// Reads an array length prefix. `None` is the null array (-1). Any other negative value is
/// malformed and a length above the decoding limit is rejected before anything is allocated.
pub fn read_array_length<S: Read + ?Sized>(
    stream: &mut S,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Option<usize>> {
    let len = read_i32(stream)?;
    if len == -1 {
        Ok(None)
    } else if len < -1 {
        error!("Array length is negative value {} and invalid", len);
        Err(StatusCode::BadDecodingError)
    } else if len as usize > decoding_options.max_array_length {
        error!(
            "Array length {} exceeds decoding limit {}",
            len, decoding_options.max_array_length
        );
        Err(StatusCode::BadEncodingLimitsExceeded)
    } else {
        Ok(Some(len as usize))
    }
}

/// Byte length of an encoded dimensions array
pub fn byte_len_dimensions(dimensions: &[u32]) -> usize {
    4 + dimensions.len() * 4
}

/// Writes array dimensions. Dimensions are encoded as Int32 even though they are presented as
/// UInt32 everywhere else.
pub fn write_dimensions<S: Write + ?Sized>(
    stream: &mut S,
    dimensions: &[u32],
) -> EncodingResult<usize> {
    let mut size = write_array_length(stream, dimensions.len())?;
    for dimension in dimensions {
        let dimension = i32::try_from(*dimension).map_err(|_| {
            error!("Array dimension {} is too large to encode", dimension);
            StatusCode::BadEncodingError
        })?;
        size += write_i32(stream, dimension)?;
    }
    Ok(size)
}

/// Reads array dimensions. There must be at least one dimension and every dimension must be
/// greater than zero.
pub fn read_dimensions<S: Read + ?Sized>(
    stream: &mut S,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Vec<u32>> {
    let dimensions: Vec<i32> = match read_array(stream, decoding_options)? {
        Some(dimensions) if !dimensions.is_empty() => dimensions,
        _ => {
            error!("Array dimensions are missing despite being flagged as present");
            return Err(StatusCode::BadDecodingError);
        }
    };
    dimensions
        .into_iter()
        .map(|d| {
            if d <= 0 {
                error!("Invalid array dimension {}", d);
                Err(StatusCode::BadDecodingError)
            } else {
                Ok(d as u32)
            }
        })
        .collect()
}

/// Returns the number of elements described by the dimensions, or `None` if the product
/// overflows.
pub fn dimensions_product(dimensions: &[u32]) -> Option<usize> {
    dimensions
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d as usize))
}

/// Reads a length prefixed run of bytes. -1 is the null value. The length is checked against the
/// supplied limit and the message size limit, and the bytes are read incrementally so a declared
/// length larger than the remaining input can never allocate more than was actually supplied.
pub fn read_length_prefixed_bytes<S: Read + ?Sized>(
    stream: &mut S,
    max_length: usize,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Option<Vec<u8>>> {
    let len = read_i32(stream)?;
    if len == -1 {
        return Ok(None);
    } else if len < -1 {
        error!("Buffer length is a negative number {}", len);
        return Err(StatusCode::BadDecodingError);
    }
    let len = len as usize;
    if len > max_length {
        error!("Buffer length {} exceeds decoding limit {}", len, max_length);
        return Err(StatusCode::BadEncodingLimitsExceeded);
    }
    if decoding_options.max_message_size > 0 && len > decoding_options.max_message_size {
        error!(
            "Buffer length {} exceeds message size limit {}",
            len, decoding_options.max_message_size
        );
        return Err(StatusCode::BadEncodingLimitsExceeded);
    }
    let mut buf = Vec::with_capacity(len.min(4096));
    let read = process_decode_io_result(stream.take(len as u64).read_to_end(&mut buf))?;
    if read != len {
        error!("Buffer declared {} bytes but only {} were available", len, read);
        return Err(StatusCode::BadEndOfStream);
    }
    Ok(Some(buf))
}

/// Writes a length prefixed run of bytes, -1 for the null value
pub fn write_length_prefixed_bytes<S: Write + ?Sized>(
    stream: &mut S,
    value: Option<&[u8]>,
) -> EncodingResult<usize> {
    match value {
        None => write_i32(stream, -1),
        Some(buf) => {
            let mut size = write_array_length(stream, buf.len())?;
            size += write_all(stream, buf)?;
            Ok(size)
        }
    }
}

/// Writes the whole buffer to the stream
pub fn write_all<S: Write + ?Sized>(stream: &mut S, buf: &[u8]) -> EncodingResult<usize> {
    process_encode_io_result(stream.write_all(buf).map(|_| buf.len()))
}

/// Writes an unsigned byte to the stream
pub fn write_u8<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<u8>,
{
    let buf: [u8; 1] = [value.into()];
    write_all(stream, &buf)
}

/// Writes a signed 16-bit value to the stream
pub fn write_i16<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<i16>,
{
    let mut buf = [0u8; 2];
    LittleEndian::write_i16(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes an unsigned 16-bit value to the stream
pub fn write_u16<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<u16>,
{
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes a signed 32-bit value to the stream
pub fn write_i32<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<i32>,
{
    let mut buf = [0u8; 4];
    LittleEndian::write_i32(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes an unsigned 32-bit value to the stream
pub fn write_u32<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<u32>,
{
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes a signed 64-bit value to the stream
pub fn write_i64<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<i64>,
{
    let mut buf = [0u8; 8];
    LittleEndian::write_i64(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes an unsigned 64-bit value to the stream
pub fn write_u64<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<u64>,
{
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes a 32-bit precision value to the stream
pub fn write_f32<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<f32>,
{
    let mut buf = [0u8; 4];
    LittleEndian::write_f32(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Writes a 64-bit precision value to the stream
pub fn write_f64<S, T>(stream: &mut S, value: T) -> EncodingResult<usize>
where
    S: Write + ?Sized,
    T: Into<f64>,
{
    let mut buf = [0u8; 8];
    LittleEndian::write_f64(&mut buf, value.into());
    write_all(stream, &buf)
}

/// Reads an array of bytes from the stream
pub fn read_bytes<S: Read + ?Sized>(stream: &mut S, buf: &mut [u8]) -> EncodingResult<usize> {
    process_decode_io_result(stream.read_exact(buf))?;
    Ok(buf.len())
}

/// Read an unsigned byte from the stream
pub fn read_u8<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<u8> {
    let mut buf = [0u8];
    read_bytes(stream, &mut buf)?;
    Ok(buf[0])
}

/// Read an signed 16-bit value from the stream
pub fn read_i16<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<i16> {
    let mut buf = [0u8; 2];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_i16(&buf))
}

/// Read an unsigned 16-bit value from the stream
pub fn read_u16<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<u16> {
    let mut buf = [0u8; 2];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_u16(&buf))
}

/// Read a signed 32-bit value from the stream
pub fn read_i32<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<i32> {
    let mut buf = [0u8; 4];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_i32(&buf))
}

/// Read an unsigned 32-bit value from the stream
pub fn read_u32<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<u32> {
    let mut buf = [0u8; 4];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_u32(&buf))
}

/// Read a signed 64-bit value from the stream
pub fn read_i64<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<i64> {
    let mut buf = [0u8; 8];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_i64(&buf))
}

/// Read an unsigned 64-bit value from the stream
pub fn read_u64<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<u64> {
    let mut buf = [0u8; 8];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_u64(&buf))
}

/// Read a 32-bit precision value from the stream
pub fn read_f32<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<f32> {
    let mut buf = [0u8; 4];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_f32(&buf))
}

/// Read a 64-bit precision from the stream
pub fn read_f64<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<f64> {
    let mut buf = [0u8; 8];
    read_bytes(stream, &mut buf)?;
    Ok(LittleEndian::read_f64(&buf))
}
