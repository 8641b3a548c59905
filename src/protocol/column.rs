use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::ColumnFlags;
use crate::driver::ColumnDescriptor;
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::*;

/// Fixed-size tail of a column definition packet (12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    _reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    pub fn column_type(&self) -> u8 {
        self.column_type
    }

    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_retain(self.flags.get())
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

/// Column definition (protocol 4.1) borrowed from its packet
#[derive(Debug, Clone)]
pub struct ColumnDefinition<'a> {
    pub schema: &'a [u8],
    pub table_alias: &'a [u8],
    pub name_alias: &'a [u8],
    pub name_original: &'a [u8],
    pub tail: &'a ColumnDefinitionTail,
}

impl<'a> ColumnDefinition<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (_catalog, data) = read_string_lenenc(payload)?;
        let (schema, data) = read_string_lenenc(data)?;
        let (table_alias, data) = read_string_lenenc(data)?;
        let (_table_original, data) = read_string_lenenc(data)?;
        let (name_alias, data) = read_string_lenenc(data)?;
        let (name_original, data) = read_string_lenenc(data)?;

        // length of fixed fields, always 0x0c
        let (fixed_len, data) = read_int_lenenc(data)?;
        if fixed_len != 0x0c {
            let report = eyre!("column definition fixed length is {fixed_len}, expected 12");
            return Err(Error::LibraryBug(report));
        }
        let Ok((tail, _default_values)) = ColumnDefinitionTail::ref_from_prefix(data) else {
            return Err(Error::UnexpectedEof);
        };

        Ok(Self {
            schema,
            table_alias,
            name_alias,
            name_original,
            tail,
        })
    }

    /// Convert to the driver-neutral descriptor of column `ordinal` (1-based)
    pub fn to_descriptor(&self, ordinal: usize) -> ColumnDescriptor {
        let name = match simdutf8::basic::from_utf8(self.name_alias) {
            Ok(name) => std::borrow::Cow::Borrowed(name),
            Err(_) => String::from_utf8_lossy(self.name_alias),
        };
        let mut descriptor = ColumnDescriptor::new(
            &name,
            ordinal,
            self.tail.column_type(),
            self.tail.column_length() as usize,
        );
        descriptor.decimal_digits = self.tail.decimals();
        descriptor.nullable = !self.tail.flags().contains(ColumnFlags::NOT_NULL_FLAG);
        descriptor
    }
}
