//! Byte-oriented encoding of the serialised graph form.
//!
//! The layout is self-delimiting: arrays carry a big-endian `u32` length
//! prefix and every optional field carries a single presence byte, so a
//! value can be decoded from the front of a stream without a length header.

use crate::errors::{DecResult, DecodeError};
use crate::types::{VersionId, VersionName};

pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

pub trait Decode: Sized {
    /// Decodes a value from the front of `input`, advancing it past the
    /// consumed bytes.
    fn decode(input: &mut &[u8]) -> DecResult<Self>;

    /// Decodes a value that must span the whole input.
    fn decode_all(mut input: &[u8]) -> DecResult<Self> {
        let decoded = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(decoded)
    }
}

fn take<'a>(input: &mut &'a [u8], len: usize) -> DecResult<&'a [u8]> {
    if input.len() < len {
        return Err(DecodeError::UnexpectedEnd);
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

impl Encode for u32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_be_bytes());
    }
}

impl Decode for u32 {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        const BYTES: usize = std::mem::size_of::<u32>();
        Ok(u32::from_be_bytes(take(input, BYTES)?.try_into().unwrap()))
    }
}

impl Encode for u64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_be_bytes());
    }
}

impl Decode for u64 {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        const BYTES: usize = std::mem::size_of::<u64>();
        Ok(u64::from_be_bytes(take(input, BYTES)?.try_into().unwrap()))
    }
}

impl Encode for VersionId {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for VersionId {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        Ok(VersionId::from_slice(take(input, VersionId::len_bytes())?))
    }
}

impl Encode for VersionName {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.index.encode(buf);
        self.id.encode(buf);
    }
}

impl Decode for VersionName {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        let index = u64::decode(input)?;
        let id = VersionId::decode(input)?;
        Ok(VersionName::new(index, id))
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Some(value) => {
                buf.push(1);
                value.encode(buf);
            }
            None => buf.push(0),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        match take(input, 1)?[0] {
            0 => Ok(None),
            1 => Ok(Some(T::decode(input)?)),
            byte => Err(DecodeError::InvalidPresenceByte(byte)),
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        (self.len() as u32).encode(buf);
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        let len = u32::decode(input)? as usize;
        // the length prefix is untrusted; cap the preallocation
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        let mut buf = Vec::new();
        0xdead_beef_u32.encode(&mut buf);
        0x0123_4567_89ab_cdef_u64.encode(&mut buf);
        assert_eq!(buf.len(), 12);

        let mut input = buf.as_slice();
        assert_eq!(u32::decode(&mut input), Ok(0xdead_beef));
        assert_eq!(u64::decode(&mut input), Ok(0x0123_4567_89ab_cdef));
        assert!(input.is_empty());
    }

    #[test]
    fn version_name_round_trips() {
        let name = VersionName::new(42, VersionId::repeat_byte(0x5a));
        let buf = name.encode_to_vec();
        assert_eq!(buf.len(), 8 + 64);
        assert_eq!(VersionName::decode_all(&buf), Ok(name));
    }

    #[test]
    fn optional_uses_one_presence_byte() {
        let absent: Option<u32> = None;
        assert_eq!(absent.encode_to_vec(), vec![0]);

        let present = Some(7u32);
        assert_eq!(present.encode_to_vec(), vec![1, 0, 0, 0, 7]);

        assert_eq!(Option::<u32>::decode_all(&[0]), Ok(None));
        assert_eq!(Option::<u32>::decode_all(&[1, 0, 0, 0, 7]), Ok(Some(7)));
    }

    #[test]
    fn bad_presence_byte_is_rejected() {
        assert_eq!(
            Option::<u32>::decode_all(&[2]),
            Err(DecodeError::InvalidPresenceByte(2))
        );
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert_eq!(u32::decode_all(&[0, 0]), Err(DecodeError::UnexpectedEnd));
        assert_eq!(
            VersionName::decode_all(&[0; 30]),
            Err(DecodeError::UnexpectedEnd)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        assert_eq!(
            u32::decode_all(&[0, 0, 0, 1, 9]),
            Err(DecodeError::TrailingBytes)
        );
    }

    #[test]
    fn vectors_are_length_prefixed() {
        let values = vec![1u32, 2, 3];
        let buf = values.encode_to_vec();
        assert_eq!(buf.len(), 4 + 3 * 4);
        assert_eq!(Vec::<u32>::decode_all(&buf), Ok(values));

        // a declared length the input cannot satisfy
        assert_eq!(
            Vec::<u32>::decode_all(&[0, 0, 0, 2, 0, 0, 0, 1]),
            Err(DecodeError::UnexpectedEnd)
        );
    }
}
