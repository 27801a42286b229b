use netstrings_serde::{
    BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger,
};

use crate::{
    constants::MAX_TABLES_BITS,
    table::string_table::{PayloadLayout, TableFlags},
    types::TableId,
};

fn write_data(writer: &mut dyn BitWrite, data_bits: u32, data: &[u8]) {
    UnsignedVariableInteger::<11>::new(data_bits).ser(writer);
    writer.write_bits(data, data_bits);
}

fn read_data(reader: &mut BitReader) -> Result<(u32, Vec<u8>), SerdeErr> {
    let data_bits = UnsignedVariableInteger::<11>::de(reader)?
        .to::<u32>()
        .ok_or(SerdeErr)?;
    let data = reader.read_bits(data_bits)?;
    Ok((data_bits, data))
}

fn read_u32<const BITS: u8>(reader: &mut BitReader) -> Result<u32, SerdeErr> {
    UnsignedVariableInteger::<BITS>::de(reader)?
        .to::<u32>()
        .ok_or(SerdeErr)
}

/// Changed entries of one table, as produced by `StringTable::write_update`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateStringTableMessage {
    pub table_id: TableId,
    pub num_changed_entries: u32,
    pub data_bits: u32,
    pub data: Vec<u8>,
}

impl UpdateStringTableMessage {
    pub fn new(table_id: TableId, num_changed_entries: u32, data: BitWriter) -> Self {
        Self {
            table_id,
            num_changed_entries,
            data_bits: data.bits_written(),
            data: data.to_bytes(),
        }
    }

    pub fn reader(&self) -> BitReader<'_> {
        BitReader::with_bit_length(&self.data, self.data_bits as usize)
    }
}

impl Serde for UpdateStringTableMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<MAX_TABLES_BITS>::new(self.table_id).ser(writer);
        UnsignedVariableInteger::<7>::new(self.num_changed_entries).ser(writer);
        write_data(writer, self.data_bits, &self.data);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let table_id = UnsignedInteger::<MAX_TABLES_BITS>::de(reader)?
            .to::<TableId>()
            .ok_or(SerdeErr)?;
        let num_changed_entries = read_u32::<7>(reader)?;
        let (data_bits, data) = read_data(reader)?;
        Ok(Self {
            table_id,
            num_changed_entries,
            data_bits,
            data,
        })
    }

    fn bit_length(&self) -> u32 {
        UnsignedInteger::<MAX_TABLES_BITS>::new(self.table_id).bit_length()
            + UnsignedVariableInteger::<7>::new(self.num_changed_entries).bit_length()
            + UnsignedVariableInteger::<11>::new(self.data_bits).bit_length()
            + self.data_bits
    }
}

/// Definition and full contents of one table, sent when a consumer connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateStringTableMessage {
    pub name: String,
    pub max_entries: u32,
    pub num_entries: u32,
    pub flags: TableFlags,
    pub payload_layout: PayloadLayout,
    pub data_bits: u32,
    pub data: Vec<u8>,
}

impl CreateStringTableMessage {
    pub fn reader(&self) -> BitReader<'_> {
        BitReader::with_bit_length(&self.data, self.data_bits as usize)
    }

    fn layout_fields(&self) -> (bool, u32, u32) {
        match self.payload_layout {
            PayloadLayout::Variable => (false, 0, 0),
            PayloadLayout::Fixed { bytes, bits } => (true, u32::from(bytes), u32::from(bits)),
        }
    }
}

impl Serde for CreateStringTableMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let (fixed, payload_size, payload_bits) = self.layout_fields();

        self.name.ser(writer);
        UnsignedVariableInteger::<7>::new(self.max_entries).ser(writer);
        UnsignedVariableInteger::<7>::new(self.num_entries).ser(writer);
        self.flags.bits().ser(writer);
        fixed.ser(writer);
        UnsignedVariableInteger::<7>::new(payload_size).ser(writer);
        UnsignedVariableInteger::<7>::new(payload_bits).ser(writer);
        write_data(writer, self.data_bits, &self.data);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let name = String::de(reader)?;
        let max_entries = read_u32::<7>(reader)?;
        let num_entries = read_u32::<7>(reader)?;
        let flags = TableFlags::from_bits(u8::de(reader)?);
        let fixed = bool::de(reader)?;
        let payload_size = read_u32::<7>(reader)?;
        let payload_bits = read_u32::<7>(reader)?;
        let (data_bits, data) = read_data(reader)?;

        let payload_layout = if fixed {
            PayloadLayout::Fixed {
                bytes: u16::try_from(payload_size).map_err(|_| SerdeErr)?,
                bits: u8::try_from(payload_bits).map_err(|_| SerdeErr)?,
            }
        } else {
            PayloadLayout::Variable
        };

        Ok(Self {
            name,
            max_entries,
            num_entries,
            flags,
            payload_layout,
            data_bits,
            data,
        })
    }

    fn bit_length(&self) -> u32 {
        let (fixed, payload_size, payload_bits) = self.layout_fields();

        self.name.bit_length()
            + UnsignedVariableInteger::<7>::new(self.max_entries).bit_length()
            + UnsignedVariableInteger::<7>::new(self.num_entries).bit_length()
            + self.flags.bits().bit_length()
            + fixed.bit_length()
            + UnsignedVariableInteger::<7>::new(payload_size).bit_length()
            + UnsignedVariableInteger::<7>::new(payload_bits).bit_length()
            + UnsignedVariableInteger::<11>::new(self.data_bits).bit_length()
            + self.data_bits
    }
}
