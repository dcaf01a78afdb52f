#![forbid(unsafe_code)]

//! Reference `.npy` codec.
//!
//! Written against the format description only, so it can judge files
//! produced by the library under test without sharing any of its code.
//! The writer reproduces `numpy.save` byte for byte: sorted header keys,
//! growth-axis padding and 64-byte header alignment.

use npc_dtype::{ByteOrder, DType, DTypeError, Scalar};
use npc_ndarray::{ContiguityFlags, MemoryOrder, NdLayout};
use thiserror::Error;

pub const NPY_MAGIC_PREFIX: [u8; 6] = [0x93, b'N', b'U', b'M', b'P', b'Y'];

pub const MAX_HEADER_BYTES: usize = 65_536;
/// `numpy.lib.format.ARRAY_ALIGN`.
pub const ARRAY_ALIGN: usize = 64;
/// Spare header room NumPy reserves so the growth axis can be rewritten in place.
pub const GROWTH_AXIS_MAX_DIGITS: usize = 21;
/// NumPy's own rank ceiling.
pub const NPY_MAXDIMS: usize = 32;

pub const IO_REASON_CODES: [&str; 5] = [
    "io_magic_invalid",
    "io_header_schema_invalid",
    "io_dtype_descriptor_invalid",
    "io_write_contract_violation",
    "io_read_payload_incomplete",
];
const NPY_HEADER_REQUIRED_KEYS: [&str; 3] = ["descr", "fortran_order", "shape"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IOError {
    #[error("invalid or unsupported npy magic/version")]
    MagicInvalid,
    #[error("{0}")]
    HeaderSchemaInvalid(&'static str),
    #[error("dtype descriptor '{0}' is invalid or unsupported")]
    DTypeDescriptorInvalid(String),
    #[error("{0}")]
    WriteContractViolation(&'static str),
    #[error("{0}")]
    ReadPayloadIncomplete(&'static str),
}

impl IOError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MagicInvalid => "io_magic_invalid",
            Self::HeaderSchemaInvalid(_) => "io_header_schema_invalid",
            Self::DTypeDescriptorInvalid(_) => "io_dtype_descriptor_invalid",
            Self::WriteContractViolation(_) => "io_write_contract_violation",
            Self::ReadPayloadIncomplete(_) => "io_read_payload_incomplete",
        }
    }
}

impl From<DTypeError> for IOError {
    fn from(_: DTypeError) -> Self {
        Self::ReadPayloadIncomplete("element bytes do not match dtype item size")
    }
}

/// Array-protocol type string such as `<i4`, `>c16` or `|b1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NpyDescr {
    pub dtype: DType,
    pub byte_order: ByteOrder,
}

impl NpyDescr {
    /// Normalizes the byte order the way NumPy does: `|` for single-byte kinds.
    pub fn new(dtype: DType, byte_order: ByteOrder) -> Result<Self, IOError> {
        let byte_order = byte_order
            .normalize_for(dtype)
            .map_err(|_| IOError::DTypeDescriptorInvalid(format!("|{}", dtype.code())))?;
        Ok(Self { dtype, byte_order })
    }

    #[must_use]
    pub fn encode(self) -> String {
        format!(
            "{}{}{}",
            self.byte_order.symbol(),
            self.dtype.kind_char(),
            self.dtype.item_size()
        )
    }

    pub fn decode(descr: &str) -> Result<Self, IOError> {
        let invalid = || IOError::DTypeDescriptorInvalid(descr.to_string());
        let mut chars = descr.chars();
        let order = chars
            .next()
            .and_then(ByteOrder::from_symbol)
            .ok_or_else(invalid)?;
        let kind = chars.next().ok_or_else(invalid)?;
        let item_size = chars.as_str().parse::<usize>().map_err(|_| invalid())?;
        let dtype = DType::from_kind_and_size(kind, item_size).ok_or_else(invalid)?;
        Self::new(dtype, order).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub descr: NpyDescr,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Header `numpy.save` writes for an array stored with `layout`:
    /// `fortran_order` is set only for F-contiguous, non-C-contiguous data.
    #[must_use]
    pub fn for_layout(descr: NpyDescr, layout: &NdLayout) -> Self {
        Self {
            descr,
            fortran_order: layout.flags().farray(),
            shape: layout.shape.clone(),
        }
    }

    #[must_use]
    pub fn memory_order(&self) -> MemoryOrder {
        if self.fortran_order {
            MemoryOrder::F
        } else {
            MemoryOrder::C
        }
    }

    /// Layout of the array this header describes once loaded.
    pub fn layout(&self) -> Result<NdLayout, IOError> {
        NdLayout::contiguous(
            self.shape.clone(),
            self.descr.dtype.item_size(),
            self.memory_order(),
        )
        .map_err(|_| IOError::HeaderSchemaInvalid("shape has more elements than usize can count"))
    }

    pub fn flags(&self) -> Result<ContiguityFlags, IOError> {
        self.layout().map(|layout| layout.flags())
    }

    pub fn element_count(&self) -> Result<usize, IOError> {
        element_count(&self.shape)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyArrayBytes {
    pub version: (u8, u8),
    pub header: NpyHeader,
    pub payload: Vec<u8>,
}

impl NpyArrayBytes {
    /// Decodes the payload into scalars, in storage order.
    pub fn elements(&self) -> Result<Vec<Scalar>, IOError> {
        decode_elements(&self.header, &self.payload)
    }
}

fn element_count(shape: &[usize]) -> Result<usize, IOError> {
    npc_ndarray::element_count(shape)
        .map_err(|_| IOError::HeaderSchemaInvalid("shape has more elements than usize can count"))
}

fn npy_length_field_size(version: (u8, u8)) -> Result<usize, IOError> {
    match version {
        (1, 0) => Ok(2),
        (2, 0) | (3, 0) => Ok(4),
        _ => Err(IOError::MagicInvalid),
    }
}

/// Python `repr` of a shape tuple: `()`, `(5,)`, `(2, 3)`.
#[must_use]
pub fn shape_tuple_repr(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({single},)"),
        _ => {
            let joined = shape
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({joined})")
        }
    }
}

fn encode_header_dict(header: &NpyHeader) -> String {
    let fortran_order = if header.fortran_order {
        "True"
    } else {
        "False"
    };
    let mut dictionary = format!(
        "{{'descr': '{}', 'fortran_order': {fortran_order}, 'shape': {}, }}",
        header.descr.encode(),
        shape_tuple_repr(&header.shape)
    );
    let growth_axis = if header.fortran_order {
        header.shape.last()
    } else {
        header.shape.first()
    };
    if let Some(extent) = growth_axis {
        let digits = extent.to_string().len();
        dictionary.extend(std::iter::repeat_n(
            ' ',
            GROWTH_AXIS_MAX_DIGITS.saturating_sub(digits),
        ));
    }
    dictionary
}

/// Header region (dictionary, alignment padding, newline) for `version`.
fn encode_npy_header_bytes(header: &NpyHeader, version: (u8, u8)) -> Result<Vec<u8>, IOError> {
    let length_field_size = npy_length_field_size(version)?;
    let dictionary = encode_header_dict(header);
    let prefix_len = NPY_MAGIC_PREFIX.len() + 2 + length_field_size;
    let unpadded = dictionary.len() + 1;
    let padding = ARRAY_ALIGN - ((prefix_len + unpadded) % ARRAY_ALIGN);

    let mut header_bytes = Vec::with_capacity(unpadded + padding);
    header_bytes.extend_from_slice(dictionary.as_bytes());
    header_bytes.extend(std::iter::repeat_n(b' ', padding));
    header_bytes.push(b'\n');
    Ok(header_bytes)
}

/// Magic string, version bytes and the little-endian header length.
fn npy_preamble(version: (u8, u8), header_len: usize) -> Result<Vec<u8>, IOError> {
    let length_field = match npy_length_field_size(version)? {
        2 => u16::try_from(header_len).map(|len| len.to_le_bytes().to_vec()),
        _ => u32::try_from(header_len).map(|len| len.to_le_bytes().to_vec()),
    }
    .map_err(|_| IOError::HeaderSchemaInvalid("header too long for the version's length field"))?;

    let mut preamble = NPY_MAGIC_PREFIX.to_vec();
    preamble.extend_from_slice(&[version.0, version.1]);
    preamble.extend(length_field);
    Ok(preamble)
}

fn validate_write_payload(header: &NpyHeader, payload_len: usize) -> Result<(), IOError> {
    let item_size = header.descr.dtype.item_size();
    if !payload_len.is_multiple_of(item_size) {
        return Err(IOError::WriteContractViolation(
            "payload length is not a whole number of elements",
        ));
    }
    let expected = element_count(&header.shape)
        .map_err(|_| IOError::WriteContractViolation("shape element count overflows usize"))?;
    if payload_len / item_size != expected {
        return Err(IOError::WriteContractViolation(
            "value count does not match shape element count",
        ));
    }
    Ok(())
}

/// Serializes like `numpy.save`: version 1.0 unless the header outgrows
/// its u16 length field, then 2.0.
pub fn write_npy_bytes(header: &NpyHeader, payload: &[u8]) -> Result<Vec<u8>, IOError> {
    let v1_header = encode_npy_header_bytes(header, (1, 0))?;
    let version = if u16::try_from(v1_header.len()).is_ok() {
        (1, 0)
    } else {
        (2, 0)
    };
    write_npy_bytes_with_version(header, payload, version)
}

pub fn write_npy_bytes_with_version(
    header: &NpyHeader,
    payload: &[u8],
    version: (u8, u8),
) -> Result<Vec<u8>, IOError> {
    validate_write_payload(header, payload.len())?;

    let header_bytes = encode_npy_header_bytes(header, version)?;
    let mut encoded = npy_preamble(version, header_bytes.len())?;
    encoded.reserve(header_bytes.len() + payload.len());
    encoded.extend_from_slice(&header_bytes);
    encoded.extend_from_slice(payload);
    Ok(encoded)
}

/// Encodes `values` (storage order) under `header`.
pub fn encode_array(header: &NpyHeader, values: &[Scalar]) -> Result<Vec<u8>, IOError> {
    if values
        .iter()
        .any(|value| value.dtype() != header.descr.dtype)
    {
        return Err(IOError::WriteContractViolation(
            "value dtype does not match header descr",
        ));
    }
    let mut payload = Vec::with_capacity(values.len() * header.descr.dtype.item_size());
    for value in values {
        value.write_bytes(header.descr.byte_order, &mut payload);
    }
    write_npy_bytes(header, &payload)
}

pub fn read_npy_bytes(bytes: &[u8]) -> Result<NpyArrayBytes, IOError> {
    let version = validate_magic_version(bytes)?;
    let (header_offset, header_len) = read_header_span(bytes, version)?;
    let header_end = header_offset + header_len;
    let header = parse_header_dictionary(&bytes[header_offset..header_end])?;
    let body = &bytes[header_end..];

    validate_read_payload(&header, body.len())?;

    Ok(NpyArrayBytes {
        version,
        header,
        payload: body.to_vec(),
    })
}

pub fn decode_elements(header: &NpyHeader, payload: &[u8]) -> Result<Vec<Scalar>, IOError> {
    let expected = validate_read_payload(header, payload.len())?;
    let mut values = Vec::with_capacity(expected);
    for chunk in payload.chunks_exact(header.descr.dtype.item_size()) {
        values.push(Scalar::read_bytes(
            header.descr.dtype,
            header.descr.byte_order,
            chunk,
        )?);
    }
    Ok(values)
}

pub fn validate_magic_version(bytes: &[u8]) -> Result<(u8, u8), IOError> {
    if bytes.len() < 8 || bytes[..6] != NPY_MAGIC_PREFIX {
        return Err(IOError::MagicInvalid);
    }
    let version = (bytes[6], bytes[7]);
    npy_length_field_size(version).map(|_| version)
}

/// Payload must be exactly `count × item_size` bytes; returns the count.
pub fn validate_read_payload(header: &NpyHeader, payload_len: usize) -> Result<usize, IOError> {
    let expected_count = element_count(&header.shape)
        .map_err(|_| IOError::ReadPayloadIncomplete("shape element count overflows usize"))?;
    let expected_bytes = expected_count
        .checked_mul(header.descr.dtype.item_size())
        .ok_or(IOError::ReadPayloadIncomplete("payload size overflows usize"))?;
    if payload_len != expected_bytes {
        return Err(IOError::ReadPayloadIncomplete(
            "payload length differs from element count times item size",
        ));
    }
    Ok(expected_count)
}

/// Offset and length of the header region that follows the preamble.
fn read_header_span(bytes: &[u8], version: (u8, u8)) -> Result<(usize, usize), IOError> {
    let truncated = || IOError::HeaderSchemaInvalid("file ends inside the header");
    let (offset, header_len): (usize, usize) = match version {
        (1, 0) => {
            let field = bytes.get(8..10).ok_or_else(truncated)?;
            (10, usize::from(u16::from_le_bytes([field[0], field[1]])))
        }
        (2, 0) | (3, 0) => {
            let field = bytes.get(8..12).ok_or_else(truncated)?;
            let declared = u32::from_le_bytes([field[0], field[1], field[2], field[3]]);
            let declared = usize::try_from(declared)
                .map_err(|_| IOError::HeaderSchemaInvalid("header length does not fit usize"))?;
            (12, declared)
        }
        _ => return Err(IOError::MagicInvalid),
    };

    if header_len == 0 || header_len > MAX_HEADER_BYTES {
        return Err(IOError::HeaderSchemaInvalid(
            "declared header length is zero or above 64 KiB",
        ));
    }
    match offset.checked_add(header_len) {
        Some(end) if end <= bytes.len() => Ok((offset, header_len)),
        _ => Err(truncated()),
    }
}

fn value_after_key<'a>(dictionary: &'a str, key: &str) -> Result<&'a str, IOError> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let (start, len) = quoted
        .iter()
        .find_map(|needle| dictionary.find(needle.as_str()).map(|at| (at, needle.len())))
        .ok_or(IOError::HeaderSchemaInvalid("header key not found"))?;
    dictionary[start + len..]
        .trim_start()
        .strip_prefix(':')
        .map(str::trim_start)
        .ok_or(IOError::HeaderSchemaInvalid("header key not followed by ':'"))
}

/// Body of the string literal that opens `value`.
fn parse_quoted_value(value: &str) -> Result<&str, IOError> {
    let not_a_string = || IOError::HeaderSchemaInvalid("descr value is not a string literal");
    let quote = value
        .chars()
        .next()
        .filter(|c| matches!(*c, '\'' | '"'))
        .ok_or_else(not_a_string)?;
    let body = &value[1..];
    body.find(quote)
        .map(|end| &body[..end])
        .ok_or_else(not_a_string)
}

/// Extents between the shape parentheses. One extent needs its trailing
/// comma, as in Python's `(5,)`.
fn parse_shape_tuple(inner: &str) -> Result<Vec<usize>, IOError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    let (extents, trailing_comma) = match inner.strip_suffix(',') {
        Some(extents) => (extents, true),
        None => (inner, false),
    };
    let shape = extents
        .split(',')
        .map(|token| token.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| IOError::HeaderSchemaInvalid("shape extent is not a non-negative integer"))?;
    if shape.len() == 1 && !trailing_comma {
        return Err(IOError::HeaderSchemaInvalid(
            "one-element shape lacks its trailing comma",
        ));
    }
    Ok(shape)
}

/// Every quoted token followed by `:`, in order of appearance.
fn parse_header_keys(dictionary: &str) -> Result<Vec<&str>, IOError> {
    let mut keys: Vec<&str> = Vec::new();
    let mut rest = dictionary;
    while let Some(open) = rest.find(['\'', '"']) {
        let quote = &rest[open..=open];
        let after_open = &rest[open + 1..];
        let close = after_open
            .find(quote)
            .ok_or(IOError::HeaderSchemaInvalid("unterminated string in header"))?;
        let token = &after_open[..close];
        rest = &after_open[close + 1..];

        if rest.trim_start().starts_with(':') {
            if keys.contains(&token) {
                return Err(IOError::HeaderSchemaInvalid("header repeats a key"));
            }
            keys.push(token);
        }
    }
    Ok(keys)
}

fn parse_header_dictionary(header_bytes: &[u8]) -> Result<NpyHeader, IOError> {
    let dictionary = std::str::from_utf8(header_bytes)
        .map_err(|_| IOError::HeaderSchemaInvalid("header is not ASCII text"))?
        .trim_end();
    if !(dictionary.starts_with('{') && dictionary.ends_with('}')) {
        return Err(IOError::HeaderSchemaInvalid("header is not a dict literal"));
    }
    let keys = parse_header_keys(dictionary)?;
    if keys.len() != NPY_HEADER_REQUIRED_KEYS.len()
        || NPY_HEADER_REQUIRED_KEYS
            .iter()
            .any(|required| !keys.contains(required))
    {
        return Err(IOError::HeaderSchemaInvalid(
            "header keys are not exactly descr, fortran_order and shape",
        ));
    }

    let descr = NpyDescr::decode(parse_quoted_value(value_after_key(dictionary, "descr")?)?)?;

    let fortran_tail = value_after_key(dictionary, "fortran_order")?;
    let fortran_order = if fortran_tail.starts_with("True") {
        true
    } else if fortran_tail.starts_with("False") {
        false
    } else {
        return Err(IOError::HeaderSchemaInvalid("fortran_order is neither True nor False"));
    };

    let shape_tail = value_after_key(dictionary, "shape")?
        .strip_prefix('(')
        .ok_or(IOError::HeaderSchemaInvalid("shape value is not a tuple"))?;
    let shape_end = shape_tail
        .find(')')
        .ok_or(IOError::HeaderSchemaInvalid("shape tuple is not closed"))?;
    let shape = parse_shape_tuple(&shape_tail[..shape_end])?;
    if shape.len() > NPY_MAXDIMS {
        return Err(IOError::HeaderSchemaInvalid(
            "shape rank exceeds NumPy's dimension limit",
        ));
    }
    element_count(&shape)?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        ARRAY_ALIGN, IO_REASON_CODES, IOError, NPY_MAGIC_PREFIX, NpyDescr, NpyHeader,
        decode_elements, encode_array, encode_header_dict, read_npy_bytes, shape_tuple_repr,
        npy_preamble, parse_shape_tuple, validate_magic_version, write_npy_bytes,
        write_npy_bytes_with_version,
    };
    use npc_dtype::{ByteOrder, DType, Scalar};
    use npc_ndarray::{MemoryOrder, NdLayout};

    fn header(dtype: DType, order: ByteOrder, shape: &[usize], fortran: bool) -> NpyHeader {
        NpyHeader {
            descr: NpyDescr::new(dtype, order).expect("descr"),
            fortran_order: fortran,
            shape: shape.to_vec(),
        }
    }

    fn manual_npy(dictionary: &str, body: &[u8]) -> Vec<u8> {
        let mut header_bytes = dictionary.as_bytes().to_vec();
        header_bytes.push(b'\n');
        let mut encoded = npy_preamble((1, 0), header_bytes.len()).expect("preamble");
        encoded.extend_from_slice(&header_bytes);
        encoded.extend_from_slice(body);
        encoded
    }

    #[test]
    fn reason_codes_cover_every_error() {
        let errors = [
            IOError::MagicInvalid,
            IOError::HeaderSchemaInvalid("x"),
            IOError::DTypeDescriptorInvalid("x".to_string()),
            IOError::WriteContractViolation("x"),
            IOError::ReadPayloadIncomplete("x"),
        ];
        for (err, code) in errors.iter().zip(IO_REASON_CODES) {
            assert_eq!(err.reason_code(), code);
        }
    }

    #[test]
    fn descriptors_normalize_single_byte_order() {
        let bool_descr = NpyDescr::new(DType::Bool, ByteOrder::Little).expect("bool");
        assert_eq!(bool_descr.encode(), "|b1");
        assert_eq!(
            NpyDescr::new(DType::Complex128, ByteOrder::Big)
                .expect("c16")
                .encode(),
            ">c16"
        );
        assert_eq!(NpyDescr::decode("<u1").expect("u1").encode(), "|u1");
        assert!(NpyDescr::decode("|i4").is_err());
        assert!(NpyDescr::decode("<f2").is_err());
        assert!(NpyDescr::decode("O").is_err());
    }

    #[test]
    fn shape_repr_matches_python_tuples() {
        assert_eq!(shape_tuple_repr(&[]), "()");
        assert_eq!(shape_tuple_repr(&[5]), "(5,)");
        assert_eq!(shape_tuple_repr(&[2, 3]), "(2, 3)");
    }

    #[test]
    fn header_dictionary_reserves_growth_axis_digits() {
        let dict = encode_header_dict(&header(DType::I32, ByteOrder::Big, &[2, 3], false));
        let literal = "{'descr': '>i4', 'fortran_order': False, 'shape': (2, 3), }";
        assert!(dict.starts_with(literal));
        assert_eq!(dict.len() - literal.len(), 20);

        let fortran = encode_header_dict(&header(DType::F64, ByteOrder::Little, &[2, 661], true));
        assert!(fortran.ends_with(&" ".repeat(18)));
    }

    #[test]
    fn written_header_is_64_byte_aligned() {
        let h = header(DType::I32, ByteOrder::Big, &[2, 3], false);
        let encoded = write_npy_bytes(&h, &[0u8; 24]).expect("encode");
        assert_eq!(&encoded[..6], &NPY_MAGIC_PREFIX);
        assert_eq!((encoded[6], encoded[7]), (1, 0));
        assert_eq!(encoded.len() - 24, 128);
        assert_eq!((encoded.len() - 24) % ARRAY_ALIGN, 0);
        assert_eq!(encoded[127], b'\n');
    }

    #[test]
    fn npy_bytes_roundtrip_preserves_header_and_payload() {
        let h = header(DType::F64, ByteOrder::Little, &[2, 2], true);
        let payload = [1.0_f64, 2.0, 3.0, 4.0]
            .into_iter()
            .flat_map(f64::to_le_bytes)
            .collect::<Vec<_>>();

        let decoded = read_npy_bytes(&write_npy_bytes(&h, &payload).expect("encode"))
            .expect("decode");
        assert_eq!(decoded.version, (1, 0));
        assert_eq!(decoded.header, h);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn npy_v2_writer_roundtrip_is_supported() {
        let h = header(DType::U16, ByteOrder::Big, &[3], false);
        let encoded = write_npy_bytes_with_version(&h, &[0u8; 6], (2, 0)).expect("v2");
        assert_eq!(validate_magic_version(&encoded), Ok((2, 0)));
        assert_eq!((encoded.len() - 6) % ARRAY_ALIGN, 0);
        assert_eq!(read_npy_bytes(&encoded).expect("decode").header, h);
    }

    #[test]
    fn npy_v3_files_are_read() {
        let h = header(DType::Complex64, ByteOrder::Little, &[2], false);
        let payload = [1.0_f32, -1.0, 2.5, 0.0]
            .into_iter()
            .flat_map(f32::to_le_bytes)
            .collect::<Vec<_>>();
        let encoded = write_npy_bytes_with_version(&h, &payload, (3, 0)).expect("v3");
        assert_eq!(&encoded[6..12], &[3, 0, 116, 0, 0, 0]);
        let decoded = read_npy_bytes(&encoded).expect("decode");
        assert_eq!(decoded.version, (3, 0));
        assert_eq!(decoded.header, h);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn preamble_rejects_header_longer_than_length_field() {
        let err = npy_preamble((1, 0), 70_000).expect_err("u16 overflow");
        assert_eq!(err.reason_code(), "io_header_schema_invalid");
        assert_eq!(
            &npy_preamble((2, 0), 70_000).expect("v2")[8..],
            &70_000u32.to_le_bytes()[..]
        );
        assert_eq!(npy_preamble((9, 9), 10), Err(IOError::MagicInvalid));
    }

    #[test]
    fn shape_tuple_bodies() {
        assert_eq!(parse_shape_tuple(""), Ok(vec![]));
        assert_eq!(parse_shape_tuple("5,"), Ok(vec![5]));
        assert_eq!(parse_shape_tuple("2, 3"), Ok(vec![2, 3]));
        assert_eq!(parse_shape_tuple(" 2, 3, "), Ok(vec![2, 3]));
        assert!(parse_shape_tuple("5").is_err());
        assert!(parse_shape_tuple(",").is_err());
        assert!(parse_shape_tuple("2,,3").is_err());
        assert!(parse_shape_tuple("-1,").is_err());
    }

    #[test]
    fn big_endian_elements_decode_in_storage_order() {
        let h = header(DType::I32, ByteOrder::Big, &[2, 3], false);
        let values: Vec<Scalar> = (0..6).map(|i| DType::I32.cast_index(i)).collect();
        let encoded = encode_array(&h, &values).expect("encode");
        let decoded = read_npy_bytes(&encoded).expect("decode");
        assert_eq!(&decoded.payload[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(decoded.elements().expect("elements"), values);
    }

    #[test]
    fn encode_rejects_mismatched_value_dtype() {
        let h = header(DType::I16, ByteOrder::Little, &[1], false);
        let err = encode_array(&h, &[Scalar::I32(1)]).expect_err("dtype mismatch");
        assert_eq!(err.reason_code(), "io_write_contract_violation");
    }

    #[test]
    fn writer_rejects_payload_item_size_misalignment() {
        let h = header(DType::F64, ByteOrder::Little, &[1], false);
        let err = write_npy_bytes(&h, &[0u8; 7]).expect_err("misaligned");
        assert_eq!(err.reason_code(), "io_write_contract_violation");
    }

    #[test]
    fn reader_rejects_payload_count_mismatch() {
        let h = header(DType::F64, ByteOrder::Little, &[2, 2], false);
        let mut encoded = write_npy_bytes(&h, &[0u8; 32]).expect("encode");
        let _ = encoded.pop();
        let err = read_npy_bytes(&encoded).expect_err("footprint mismatch");
        assert_eq!(err.reason_code(), "io_read_payload_incomplete");
        assert!(decode_elements(&h, &[0u8; 31]).is_err());
    }

    #[test]
    fn reader_rejects_truncated_header_region() {
        let h = header(DType::F64, ByteOrder::Little, &[2, 2], false);
        let mut encoded = write_npy_bytes(&h, &[0u8; 32]).expect("encode");
        encoded[8] = 0xFF;
        encoded[9] = 0x7F;
        encoded.truncate(64);
        let err = read_npy_bytes(&encoded).expect_err("declared header exceeds bytes");
        assert_eq!(err.reason_code(), "io_header_schema_invalid");
    }

    #[test]
    fn reader_rejects_corrupt_magic_and_unknown_version() {
        assert_eq!(read_npy_bytes(b"\x93NUMPX\x01\x00"), Err(IOError::MagicInvalid));
        let mut bytes = NPY_MAGIC_PREFIX.to_vec();
        bytes.extend_from_slice(&[4, 0, 0, 0]);
        assert_eq!(validate_magic_version(&bytes), Err(IOError::MagicInvalid));
    }

    #[test]
    fn header_parser_rejects_extra_keys_and_singleton_without_comma() {
        let extra = manual_npy(
            "{'descr': '<i2', 'fortran_order': False, 'shape': (1,), 'x': 1, }",
            &[0, 0],
        );
        assert_eq!(
            read_npy_bytes(&extra).expect_err("extra key").reason_code(),
            "io_header_schema_invalid"
        );

        let singleton = manual_npy(
            "{'descr': '<i2', 'fortran_order': False, 'shape': (1), }",
            &[0, 0],
        );
        assert_eq!(
            read_npy_bytes(&singleton)
                .expect_err("missing comma")
                .reason_code(),
            "io_header_schema_invalid"
        );
    }

    #[test]
    fn header_parser_accepts_reordered_double_quoted_keys() {
        let bytes = manual_npy(
            "{\"shape\": (2,), \"fortran_order\": True, \"descr\": \">u2\"}",
            &[0, 1, 0, 2],
        );
        let decoded = read_npy_bytes(&bytes).expect("decode");
        assert_eq!(decoded.header.shape, vec![2]);
        assert!(decoded.header.fortran_order);
        assert_eq!(
            decoded.elements().expect("elements"),
            vec![Scalar::U16(1), Scalar::U16(2)]
        );
    }

    #[test]
    fn effectively_1d_headers_never_claim_fortran_order() {
        let descr = NpyDescr::new(DType::F32, ByteOrder::Little).expect("descr");
        for shape in [vec![1, 4], vec![4], vec![1, 1, 2]] {
            let c = NdLayout::contiguous(shape.clone(), 4, MemoryOrder::C).expect("c");
            let f = NdLayout::contiguous(shape, 4, MemoryOrder::F).expect("f");
            assert_eq!(
                NpyHeader::for_layout(descr, &c),
                NpyHeader::for_layout(descr, &f)
            );
        }
        let f = NdLayout::contiguous(vec![2, 3], 4, MemoryOrder::F).expect("f");
        assert!(NpyHeader::for_layout(descr, &f).fortran_order);
    }
}
