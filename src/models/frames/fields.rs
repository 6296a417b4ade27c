//! Byte-order aware cursors over fixed-size header and directory records.
//!
//! Callers size the slice up front, so writes never grow it. Reads return
//! `None` past the end and leave reporting to the caller.

use crate::enums::ByteOrder;

macro_rules! put_int {
    ($name:ident, $t:ty) => {
        #[inline]
        pub fn $name(&mut self, v: $t) {
            let bytes = match self.order {
                ByteOrder::Little => v.to_le_bytes(),
                ByteOrder::Big => v.to_be_bytes(),
            };
            self.put_bytes(&bytes);
        }
    };
}

macro_rules! get_int {
    ($name:ident, $t:ty) => {
        #[inline]
        pub fn $name(&mut self) -> Option<$t> {
            const N: usize = std::mem::size_of::<$t>();
            let raw: [u8; N] = self.get_bytes(N)?.try_into().ok()?;
            Some(match self.order {
                ByteOrder::Little => <$t>::from_le_bytes(raw),
                ByteOrder::Big => <$t>::from_be_bytes(raw),
            })
        }
    };
}

pub struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> FieldWriter<'a> {
    pub fn new(buf: &'a mut [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Panics if the record was sized too small; record lengths are constants.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Leave `n` bytes as they are (zero in a freshly allocated buffer).
    #[inline]
    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.put_bytes(&[v]);
    }

    put_int!(put_u16, u16);
    put_int!(put_u32, u32);
    put_int!(put_u64, u64);
}

pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    #[inline]
    pub fn get_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let out = self.buf.get(self.pos..self.pos.checked_add(n)?)?;
        self.pos += n;
        Some(out)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> Option<()> {
        self.get_bytes(n).map(|_| ())
    }

    #[inline]
    pub fn get_u8(&mut self) -> Option<u8> {
        self.get_bytes(1).map(|b| b[0])
    }

    get_int!(get_u16, u16);
    get_int!(get_u32, u32);
    get_int!(get_u64, u64);
}
