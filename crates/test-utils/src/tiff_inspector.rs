//! Minimal TIFF reader for inspecting written rasters in tests.
//!
//! Reads the first IFD of classic or BigTIFF files, including band-separate
//! (planar) layouts that general-purpose decoders often reject.

use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Clone, Copy)]
struct Entry {
    field_type: u16,
    count: u64,
    data_offset: usize,
}

/// Parsed first image directory plus the file bytes.
#[derive(Debug)]
pub struct TiffInspector {
    bytes: Vec<u8>,
    little_endian: bool,
    bigtiff: bool,
    entries: HashMap<u16, Entry>,
}

impl TiffInspector {
    /// Parse a TIFF held in memory. Panics on malformed input.
    pub fn new(bytes: Vec<u8>) -> Self {
        let little_endian = match &bytes[0..2] {
            b"II" => true,
            b"MM" => false,
            other => panic!("not a TIFF byte-order mark: {:?}", other),
        };
        let mut raster = Self {
            bytes,
            little_endian,
            bigtiff: false,
            entries: HashMap::new(),
        };

        let magic = raster.u16_at(2);
        let (ifd, entry_len, count_len, inline_len) = match magic {
            42 => (raster.u32_at(4) as usize, 12, 2, 4),
            43 => {
                raster.bigtiff = true;
                (raster.u64_at(8) as usize, 20, 8, 8)
            }
            other => panic!("unexpected TIFF magic {}", other),
        };

        let entry_count = if raster.bigtiff {
            raster.u64_at(ifd) as usize
        } else {
            raster.u16_at(ifd) as usize
        };
        for i in 0..entry_count {
            let at = ifd + count_len + i * entry_len;
            let tag = raster.u16_at(at);
            let field_type = raster.u16_at(at + 2);
            let (count, value_at) = if raster.bigtiff {
                (raster.u64_at(at + 4), at + 12)
            } else {
                (u64::from(raster.u32_at(at + 4)), at + 8)
            };
            let size = count as usize * type_size(field_type);
            let data_offset = if size <= inline_len {
                value_at
            } else if raster.bigtiff {
                raster.u64_at(value_at) as usize
            } else {
                raster.u32_at(value_at) as usize
            };
            raster.entries.insert(
                tag,
                Entry {
                    field_type,
                    count,
                    data_offset,
                },
            );
        }
        raster
    }

    /// Read and parse a TIFF file.
    pub fn open(path: &std::path::Path) -> Self {
        Self::new(std::fs::read(path).expect("read TIFF file"))
    }

    pub fn is_bigtiff(&self) -> bool {
        self.bigtiff
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Integer tag values (SHORT, LONG or LONG8).
    pub fn tag_u64(&self, tag: u16) -> Vec<u64> {
        let entry = self.entry(tag);
        (0..entry.count as usize)
            .map(|i| match entry.field_type {
                3 => u64::from(self.u16_at(entry.data_offset + i * 2)),
                4 => u64::from(self.u32_at(entry.data_offset + i * 4)),
                16 => self.u64_at(entry.data_offset + i * 8),
                other => panic!("tag {} has non-integer type {}", tag, other),
            })
            .collect()
    }

    /// DOUBLE tag values.
    pub fn tag_f64(&self, tag: u16) -> Vec<f64> {
        let entry = self.entry(tag);
        assert_eq!(entry.field_type, 12, "tag {} is not DOUBLE", tag);
        (0..entry.count as usize)
            .map(|i| f64::from_bits(self.u64_at(entry.data_offset + i * 8)))
            .collect()
    }

    /// ASCII tag value without the trailing NUL.
    pub fn tag_ascii(&self, tag: u16) -> String {
        let entry = self.entry(tag);
        assert_eq!(entry.field_type, 2, "tag {} is not ASCII", tag);
        let raw = &self.bytes[entry.data_offset..entry.data_offset + entry.count as usize];
        String::from_utf8_lossy(raw).trim_end_matches('\0').to_string()
    }

    pub fn width(&self) -> usize {
        self.tag_u64(256)[0] as usize
    }

    pub fn height(&self) -> usize {
        self.tag_u64(257)[0] as usize
    }

    pub fn band_count(&self) -> usize {
        self.tag_u64(277)[0] as usize
    }

    /// Decompressed sample bytes of one band, top row first.
    ///
    /// Assumes band-separate strips (or a single band).
    pub fn band_bytes(&self, band: usize) -> Vec<u8> {
        let offsets = self.tag_u64(273);
        let counts = self.tag_u64(279);
        let strips_per_band = offsets.len() / self.band_count();
        let compression = self.tag_u64(259)[0];

        let mut out = Vec::new();
        for strip in band * strips_per_band..(band + 1) * strips_per_band {
            let start = offsets[strip] as usize;
            let raw = &self.bytes[start..start + counts[strip] as usize];
            match compression {
                1 => out.extend_from_slice(raw),
                8 => {
                    flate2::read::ZlibDecoder::new(raw)
                        .read_to_end(&mut out)
                        .expect("inflate strip");
                }
                other => panic!("unsupported compression {}", other),
            }
        }
        out
    }

    pub fn band_u16(&self, band: usize) -> Vec<u16> {
        self.band_bytes(band)
            .chunks_exact(2)
            .map(|b| self.read_u16([b[0], b[1]]))
            .collect()
    }

    pub fn band_u32(&self, band: usize) -> Vec<u32> {
        self.band_bytes(band)
            .chunks_exact(4)
            .map(|b| self.read_u32([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    pub fn band_f32(&self, band: usize) -> Vec<f32> {
        self.band_u32(band).into_iter().map(f32::from_bits).collect()
    }

    fn entry(&self, tag: u16) -> Entry {
        *self
            .entries
            .get(&tag)
            .unwrap_or_else(|| panic!("tag {} not present", tag))
    }

    fn read_u16(&self, b: [u8; 2]) -> u16 {
        if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        }
    }

    fn read_u32(&self, b: [u8; 4]) -> u32 {
        if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        }
    }

    fn u16_at(&self, at: usize) -> u16 {
        self.read_u16([self.bytes[at], self.bytes[at + 1]])
    }

    fn u32_at(&self, at: usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.bytes[at..at + 4]);
        self.read_u32(b)
    }

    fn u64_at(&self, at: usize) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.bytes[at..at + 8]);
        if self.little_endian {
            u64::from_le_bytes(b)
        } else {
            u64::from_be_bytes(b)
        }
    }
}

fn type_size(field_type: u16) -> usize {
    match field_type {
        // BYTE, ASCII, SBYTE, UNDEFINED
        1 | 2 | 6 | 7 => 1,
        // SHORT, SSHORT
        3 | 8 => 2,
        // LONG, SLONG, FLOAT, IFD
        4 | 9 | 11 | 13 => 4,
        // RATIONAL, SRATIONAL, DOUBLE, LONG8, SLONG8, IFD8
        5 | 10 | 12 | 16 | 17 | 18 => 8,
        other => panic!("unknown TIFF field type {}", other),
    }
}
