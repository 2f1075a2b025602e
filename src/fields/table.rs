// Two-dimensional lookup table stored in a dynamically placed region
//
// Region layout at pointer `p` (little-endian):
//   p+0   interpolation mode
//   p+1   blend variable B index
//   p+2   blend variable C index
//   p+3   reserved
//   p+4   x axis: count (u8), exponent (i8), variable (u16), count * i16 bins
//   ...   y axis, same shape
//   ...   data grid, max(h,2) rows of max(w,1) packed cells

use super::RegionAllocator;
use crate::arena::ByteArena;
use crate::bitwise::bits::{self, split_bit_address};
use crate::bitwise::{parse_axis, parse_table_header, scale, RawAxis, RawTableHeader};
use crate::core::{grid_cols, grid_rows, Axis, Encoding, TableValue, VariableTable};
use crate::error::{TuneError, TuneResult, ValidationError};

/// Size of the table pointer stored at the field offset
pub const POINTER_SIZE: usize = 2;

/// Interpolation mode, blend B, blend C, reserved
pub const TABLE_HEADER_SIZE: usize = 4;

/// Count, exponent, variable index
pub const AXIS_HEADER_SIZE: usize = 4;

/// Largest bin count an axis header can record
pub const MAX_BINS: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAxis {
    X,
    Y,
}

/// The two blend-variable slots following the interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendVar {
    B,
    C,
}

impl BlendVar {
    fn offset(self) -> usize {
        match self {
            BlendVar::B => 1,
            BlendVar::C => 2,
        }
    }
}

fn axis_size(bins: usize) -> usize {
    AXIS_HEADER_SIZE + 2 * bins
}

/// Offset of the data grid from the region start
pub fn data_origin(x_bins: usize, y_bins: usize) -> usize {
    TABLE_HEADER_SIZE + axis_size(x_bins) + axis_size(y_bins)
}

/// Bytes needed for a region with the given cell format and bin counts
///
/// The packed grid is padded to an even byte count. Allocation and the
/// live-table scan both use this, so they always agree.
pub fn region_size(cell: Encoding, x_bins: usize, y_bins: usize) -> usize {
    let data_bits = cell.bits() as usize * grid_cols(x_bins) * grid_rows(y_bins);
    let data_bytes = (data_bits + 7) / 8;
    data_origin(x_bins, y_bins) + ((data_bytes + 1) & !1)
}

/// Bit address of cell (@row, @col) in a grid starting at byte @origin
fn cell_bit_address(origin: usize, cell_bits: u32, cols: usize, row: usize, col: usize) -> usize {
    origin * 8 + cell_bits as usize * (row * cols + col)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub short_name: String,
    pub units: String,
    /// Location of the 2-byte region pointer
    pub offset: usize,
    /// Cell format
    pub encoding: Encoding,
    pub exponent: i32,
    pub conditional: Option<String>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        units: impl Into<String>,
        offset: usize,
        encoding: Encoding,
        exponent: i32,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            units: units.into(),
            offset,
            encoding,
            exponent,
            conditional: None,
        }
    }

    pub fn with_conditional(mut self, conditional: Option<String>) -> Self {
        self.conditional = conditional;
        self
    }

    /// Bytes occupied at the field offset (the pointer)
    pub fn size(&self) -> usize {
        POINTER_SIZE
    }

    fn layout_error(&self) -> TuneError {
        TuneError::Layout {
            field: self.short_name.clone(),
        }
    }

    /// Region pointer, 0 when the table is not allocated
    pub fn table_ptr(&self, arena: &ByteArena) -> TuneResult<usize> {
        Ok(arena.read_u16_le(self.offset)? as usize)
    }

    pub fn set_table_ptr(&self, arena: &mut ByteArena, ptr: usize) -> TuneResult<()> {
        let ptr = u16::try_from(ptr).map_err(|_| crate::arena::ArenaError::OutOfBounds {
            offset: ptr,
            len: 0,
            size: u16::MAX as usize + 1,
        })?;
        arena.write_u16_le(self.offset, ptr)?;
        Ok(())
    }

    pub fn is_allocated(&self, arena: &ByteArena) -> TuneResult<bool> {
        Ok(self.table_ptr(arena)? != 0)
    }

    fn allocated_ptr(&self, arena: &ByteArena) -> TuneResult<usize> {
        match self.table_ptr(arena)? {
            0 => Err(self.layout_error()),
            ptr => Ok(ptr),
        }
    }

    pub fn interpolate(&self, arena: &ByteArena) -> TuneResult<u8> {
        match self.table_ptr(arena)? {
            0 => Ok(0),
            ptr => Ok(arena.read_u8(ptr)?),
        }
    }

    pub fn set_interpolate(&self, arena: &mut ByteArena, mode: u8) -> TuneResult<()> {
        let ptr = self.allocated_ptr(arena)?;
        arena.write_u8(ptr, mode)?;
        Ok(())
    }

    /// Short name of a blend variable, `None` when unallocated
    pub fn interpolate_var(
        &self,
        arena: &ByteArena,
        variables: &VariableTable,
        which: BlendVar,
    ) -> TuneResult<Option<String>> {
        match self.table_ptr(arena)? {
            0 => Ok(None),
            ptr => {
                let index = arena.read_u8(ptr + which.offset())? as usize;
                Ok(Some(variables.at(index)?.short_name.clone()))
            }
        }
    }

    pub fn set_interpolate_var(
        &self,
        arena: &mut ByteArena,
        variables: &VariableTable,
        which: BlendVar,
        short_name: &str,
    ) -> TuneResult<()> {
        let index = blend_index(variables, short_name)?;
        let ptr = self.allocated_ptr(arena)?;
        arena.write_u8(ptr + which.offset(), index)?;
        Ok(())
    }

    fn axis_ptr(&self, arena: &ByteArena, ptr: usize, axis: TableAxis) -> TuneResult<usize> {
        let x = ptr + TABLE_HEADER_SIZE;
        match axis {
            TableAxis::X => Ok(x),
            TableAxis::Y => Ok(x + axis_size(arena.read_u8(x)? as usize)),
        }
    }

    pub fn axis_bin_count(&self, arena: &ByteArena, axis: TableAxis) -> TuneResult<usize> {
        match self.table_ptr(arena)? {
            0 => Ok(0),
            ptr => Ok(arena.read_u8(self.axis_ptr(arena, ptr, axis)?)? as usize),
        }
    }

    pub fn axis_exponent(&self, arena: &ByteArena, axis: TableAxis) -> TuneResult<i8> {
        match self.table_ptr(arena)? {
            0 => Ok(0),
            ptr => Ok(arena.read_i8(self.axis_ptr(arena, ptr, axis)? + 1)?),
        }
    }

    fn read_raw_axis(&self, arena: &ByteArena, ptr: usize, axis: TableAxis) -> TuneResult<RawAxis> {
        let at = self.axis_ptr(arena, ptr, axis)?;
        let avail = arena.len().saturating_sub(at);
        let bytes = arena.get(at, avail)?;
        let (_, raw) = parse_axis(bytes).map_err(|_| crate::arena::ArenaError::OutOfBounds {
            offset: at,
            len: AXIS_HEADER_SIZE,
            size: arena.len(),
        })?;
        Ok(raw)
    }

    /// Bound variable of an axis; axes without bins have none
    pub fn axis_variable(
        &self,
        arena: &ByteArena,
        variables: &VariableTable,
        axis: TableAxis,
    ) -> TuneResult<Option<String>> {
        Ok(self
            .decode_axis(arena, variables, axis)?
            .map(|a| a.variable))
    }

    /// Bin edges of an axis, scaled by its exponent
    pub fn axis_bins(&self, arena: &ByteArena, axis: TableAxis) -> TuneResult<Vec<f64>> {
        match self.table_ptr(arena)? {
            0 => Ok(Vec::new()),
            ptr => {
                let raw = self.read_raw_axis(arena, ptr, axis)?;
                Ok(raw
                    .bins
                    .iter()
                    .map(|&b| scale::to_real(b as i64, raw.exponent as i32))
                    .collect())
            }
        }
    }

    /// Region size of the current allocation, 0 when unallocated
    pub fn table_len(&self, arena: &ByteArena) -> TuneResult<usize> {
        if !self.is_allocated(arena)? {
            return Ok(0);
        }
        let w = self.axis_bin_count(arena, TableAxis::X)?;
        let h = self.axis_bin_count(arena, TableAxis::Y)?;
        Ok(region_size(self.encoding, w, h))
    }

    /// Grid (rows, cols) of the current allocation
    pub fn dims(&self, arena: &ByteArena) -> TuneResult<(usize, usize)> {
        let w = self.axis_bin_count(arena, TableAxis::X)?;
        let h = self.axis_bin_count(arena, TableAxis::Y)?;
        Ok((grid_rows(h), grid_cols(w)))
    }

    /// Byte, bit and width of cell (@row, @col)
    fn data_ptr(&self, arena: &ByteArena, ptr: usize, row: usize, col: usize) -> TuneResult<(usize, u32, u32)> {
        let w = self.axis_bin_count(arena, TableAxis::X)?;
        let h = self.axis_bin_count(arena, TableAxis::Y)?;
        if row >= grid_rows(h) || col >= grid_cols(w) {
            return Err(ValidationError::CellOutOfRange {
                field: self.short_name.clone(),
                row,
                col,
            }
            .into());
        }
        let origin = ptr + data_origin(w, h);
        let address = cell_bit_address(origin, self.encoding.bits(), grid_cols(w), row, col);
        let (byte, bit) = split_bit_address(address);
        Ok((byte, bit, self.encoding.bits()))
    }

    /// Cell value, 0 when unallocated
    pub fn cell(&self, arena: &ByteArena, row: usize, col: usize) -> TuneResult<f64> {
        let ptr = match self.table_ptr(arena)? {
            0 => return Ok(0.0),
            ptr => ptr,
        };
        let (byte, bit, width) = self.data_ptr(arena, ptr, row, col)?;
        let raw = arena.read_bits(byte, bit, width, self.encoding.is_signed())?;
        Ok(scale::to_real(raw, self.exponent))
    }

    pub fn set_cell(&self, arena: &mut ByteArena, row: usize, col: usize, value: f64) -> TuneResult<()> {
        let ptr = self.allocated_ptr(arena)?;
        let raw = self.cell_raw(value)?;
        let (byte, bit, width) = self.data_ptr(arena, ptr, row, col)?;
        arena.write_bits(byte, bit, width, raw)?;
        Ok(())
    }

    /// Scaled raw value for a cell; overflow is masked on write
    fn cell_raw(&self, value: f64) -> TuneResult<i64> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: self.short_name.clone(),
            }
            .into());
        }
        let raw = scale::to_raw(value, self.exponent);
        let (lo, hi) = bits::raw_range(self.encoding.bits(), self.encoding.is_signed());
        if raw < lo || raw > hi {
            tracing::warn!(
                "Table {}: value {} does not fit {} bits, storing low bits only",
                self.short_name,
                value,
                self.encoding
            );
        }
        Ok(raw)
    }

    pub fn decode_axis(
        &self,
        arena: &ByteArena,
        variables: &VariableTable,
        axis: TableAxis,
    ) -> TuneResult<Option<Axis>> {
        let ptr = match self.table_ptr(arena)? {
            0 => return Ok(None),
            ptr => ptr,
        };
        let raw = self.read_raw_axis(arena, ptr, axis)?;
        if raw.bins.is_empty() {
            return Ok(None);
        }
        let variable = variables.at(raw.variable as usize)?.short_name.clone();
        let bins = raw
            .bins
            .iter()
            .map(|&b| scale::to_real(b as i64, raw.exponent as i32))
            .collect();
        Ok(Some(Axis {
            variable,
            exponent: raw.exponent,
            bins,
        }))
    }

    pub fn decode_data(&self, arena: &ByteArena) -> TuneResult<Vec<Vec<f64>>> {
        let (rows, cols) = self.dims(arena)?;
        (0..rows)
            .map(|r| (0..cols).map(|c| self.cell(arena, r, c)).collect())
            .collect()
    }

    /// Full table content, `None` when unallocated
    pub fn decode(&self, arena: &ByteArena, variables: &VariableTable) -> TuneResult<Option<TableValue>> {
        let ptr = match self.table_ptr(arena)? {
            0 => return Ok(None),
            ptr => ptr,
        };
        let header = arena.get(ptr, TABLE_HEADER_SIZE)?;
        let (_, header) = parse_table_header(header).map_err(|_| self.layout_error())?;

        Ok(Some(TableValue {
            interpolate: header.interpolate,
            interpolate_b: variables.at(header.blend_b as usize)?.short_name.clone(),
            interpolate_c: variables.at(header.blend_c as usize)?.short_name.clone(),
            x_axis: self.decode_axis(arena, variables, TableAxis::X)?,
            y_axis: self.decode_axis(arena, variables, TableAxis::Y)?,
            data: self.decode_data(arena)?,
        }))
    }

    /// Place @value in a fresh region and point the field at it
    ///
    /// Everything is validated and laid out in a scratch buffer before the
    /// allocator runs; the old region stays referenced until the new one is
    /// written, so a failure leaves the arena untouched. `None` clears the
    /// pointer and nothing else.
    pub fn encode(
        &self,
        arena: &mut ByteArena,
        variables: &VariableTable,
        allocator: &dyn RegionAllocator,
        value: Option<&TableValue>,
    ) -> TuneResult<()> {
        let value = match value {
            Some(v) => v,
            None => return self.set_table_ptr(arena, 0),
        };

        let header = RawTableHeader {
            interpolate: value.interpolate,
            blend_b: blend_index(variables, &value.interpolate_b)?,
            blend_c: blend_index(variables, &value.interpolate_c)?,
        };
        let x = self.raw_axis(variables, value.x_axis.as_ref())?;
        let y = self.raw_axis(variables, value.y_axis.as_ref())?;

        let mut region = self.layout_region(&header, &x, &y);
        self.write_cells(&mut region, &x, &y, &value.data)?;
        self.place(arena, allocator, &region)?;
        Ok(())
    }

    /// Allocate an all-zero table without axes; returns the pointer
    pub fn allocate_empty(
        &self,
        arena: &mut ByteArena,
        allocator: &dyn RegionAllocator,
    ) -> TuneResult<usize> {
        let region = vec![0u8; region_size(self.encoding, 0, 0)];
        self.place(arena, allocator, &region)
    }

    /// Re-allocate with new axes, keeping the interpolation settings
    ///
    /// Cell data does not carry over; the new grid starts at zero.
    pub fn reshape(
        &self,
        arena: &mut ByteArena,
        variables: &VariableTable,
        allocator: &dyn RegionAllocator,
        x_axis: Option<&Axis>,
        y_axis: Option<&Axis>,
    ) -> TuneResult<usize> {
        let header = match self.table_ptr(arena)? {
            0 => RawTableHeader {
                interpolate: 0,
                blend_b: 0,
                blend_c: 0,
            },
            ptr => {
                let (_, header) = parse_table_header(arena.get(ptr, TABLE_HEADER_SIZE)?)
                    .map_err(|_| self.layout_error())?;
                header
            }
        };
        let x = self.raw_axis(variables, x_axis)?;
        let y = self.raw_axis(variables, y_axis)?;
        let region = self.layout_region(&header, &x, &y);
        self.place(arena, allocator, &region)
    }

    fn place(
        &self,
        arena: &mut ByteArena,
        allocator: &dyn RegionAllocator,
        region: &[u8],
    ) -> TuneResult<usize> {
        let ptr = allocator.allocate(arena, region.len())?;
        arena.set_bytes(ptr, region)?;
        self.set_table_ptr(arena, ptr)?;
        tracing::debug!(
            "Allocated table {} at {}-{}",
            self.short_name,
            ptr,
            ptr + region.len()
        );
        Ok(ptr)
    }

    /// Validate and scale an axis; missing or empty axes store no bins
    fn raw_axis(&self, variables: &VariableTable, axis: Option<&Axis>) -> TuneResult<Option<RawAxis>> {
        let axis = match axis {
            Some(a) if !a.bins.is_empty() => a,
            _ => return Ok(None),
        };
        if axis.bins.len() > MAX_BINS {
            return Err(ValidationError::TooManyBins {
                field: self.short_name.clone(),
                count: axis.bins.len(),
            }
            .into());
        }
        let index = variables.index_of(&axis.variable)?;
        let variable = u16::try_from(index).map_err(|_| ValidationError::VariableIndex { index })?;

        let bins = axis
            .bins
            .iter()
            .map(|&b| {
                let raw = scale::to_raw(b, axis.exponent as i32);
                if !b.is_finite() || raw < i16::MIN as i64 || raw > i16::MAX as i64 {
                    return Err(ValidationError::OutOfRange {
                        field: self.short_name.clone(),
                        value: b,
                        bits: 16,
                    });
                }
                Ok(raw as i16)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(RawAxis {
            exponent: axis.exponent,
            variable,
            bins,
        }))
    }

    /// Header and axes of a region, data grid zeroed
    fn layout_region(&self, header: &RawTableHeader, x: &Option<RawAxis>, y: &Option<RawAxis>) -> Vec<u8> {
        let w = x.as_ref().map_or(0, |a| a.bins.len());
        let h = y.as_ref().map_or(0, |a| a.bins.len());
        let mut region = Vec::with_capacity(region_size(self.encoding, w, h));

        region.extend_from_slice(&[header.interpolate, header.blend_b, header.blend_c, 0]);
        for axis in [x, y] {
            match axis {
                Some(a) => {
                    region.push(a.bins.len() as u8);
                    region.push(a.exponent as u8);
                    region.extend_from_slice(&a.variable.to_le_bytes());
                    for b in &a.bins {
                        region.extend_from_slice(&b.to_le_bytes());
                    }
                }
                None => region.extend_from_slice(&[0; AXIS_HEADER_SIZE]),
            }
        }
        region.resize(region_size(self.encoding, w, h), 0);
        region
    }

    /// Pack @data into the grid of a laid-out region
    fn write_cells(
        &self,
        region: &mut [u8],
        x: &Option<RawAxis>,
        y: &Option<RawAxis>,
        data: &[Vec<f64>],
    ) -> TuneResult<()> {
        let w = x.as_ref().map_or(0, |a| a.bins.len());
        let h = y.as_ref().map_or(0, |a| a.bins.len());
        let (rows, cols) = (grid_rows(h), grid_cols(w));

        if data.len() != rows || data.iter().any(|row| row.len() != cols) {
            return Err(ValidationError::TableShape {
                field: self.short_name.clone(),
                rows,
                cols,
            }
            .into());
        }

        let origin = data_origin(w, h);
        for (r, row) in data.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                let raw = self.cell_raw(value)?;
                let address = cell_bit_address(origin, self.encoding.bits(), cols, r, c);
                let (byte, bit) = split_bit_address(address);
                bits::write_bits(region, byte, bit, self.encoding.bits(), raw)
                    .map_err(crate::arena::ArenaError::from)?;
            }
        }
        Ok(())
    }
}

/// Index of a blend variable, which must fit its single byte
fn blend_index(variables: &VariableTable, short_name: &str) -> TuneResult<u8> {
    let index = variables.index_of(short_name)?;
    Ok(u8::try_from(index).map_err(|_| ValidationError::VariableIndex { index })?)
}
