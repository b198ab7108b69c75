//! OLE Compound File Binary reader.
//! Legacy `.xls` workbooks live in a `Workbook` (or `Book`) stream of a compound file, and
//! password-protected `.xlsx` packages are wrapped in one as `EncryptedPackage`.

use crate::error::SheetSummaryError;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use crate::helpers::bytes::to_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

/// Largest regular sector id; anything above marks free, end-of-chain or table sectors.
const MAX_REGULAR_SECTOR: usize = 0xFFFF_FFFA;
const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;
/// Streams smaller than this live in the mini stream.
const MINI_STREAM_CUTOFF: usize = 4096;

#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid compound file structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Invalid sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Sector {0} is out of bounds")]
    SectorOutOfBoundsError(usize),

    #[error("Sector chain starting at {0} does not terminate")]
    SectorChainError(usize),

    #[error("The number of file allocation table sectors is wrong: expect '{0}', actual '{1}'")]
    FileAllocationTableError(usize, usize),

    #[error("Empty root directory")]
    RootDirectoryError,
}

/// Returns true if `bytes` starts with the compound file signature.
pub(crate) fn has_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 8 && to_u64(bytes) == SIGNATURE
}

/// A fully loaded compound file.
pub(crate) struct Cfb {
    /// Directory entries by name
    streams: HashMap<String, Stream>,
    /// File allocation table: next sector of each regular sector
    fat: Vec<usize>,
    /// Regular sectors, i.e. the file after its header
    sectors: Sectors,
    /// Mini allocation table: next mini sector of each mini sector
    mini_fat: Vec<usize>,
    /// Mini sectors, i.e. the root entry's stream
    mini_sectors: Sectors,
}

impl Cfb {
    pub(crate) fn new<RS: Read + Seek>(reader: &mut RS) -> Result<Cfb, SheetSummaryError> {
        let size = reader.seek(SeekFrom::End(0))? as usize;
        if size < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;

        let header = Header::parse(&data[..HEADER_SIZE])?;
        let sectors = Sectors {
            data,
            size: header.sector_size()?,
            offset: 1,
        };
        let fat = load_fat(&sectors, &header)?;
        let streams = load_streams(&fat, &sectors, header.directory_start)?;
        let mini_fat = if header.mini_fat_count > 0 {
            to_usize_iter(&read_chain(&fat, &sectors, header.mini_fat_start)?).collect()
        } else {
            Vec::new()
        };
        let mini_sectors = match streams.get("Root Entry") {
            Some(root) => {
                let mut data = read_chain(&fat, &sectors, root.start)?;
                data.truncate(root.size);
                Sectors::mini(data)
            }
            None => Sectors::mini(Vec::new()),
        };

        Ok(Cfb {
            streams,
            fat,
            sectors,
            mini_fat,
            mini_sectors,
        })
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Contents of stream `name`, or `None` if the file has no such stream.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SheetSummaryError> {
        let Some(stream) = self.streams.get(name) else {
            return Ok(None);
        };
        let mut bytes = if stream.size < MINI_STREAM_CUTOFF {
            read_chain(&self.mini_fat, &self.mini_sectors, stream.start)?
        } else {
            read_chain(&self.fat, &self.sectors, stream.start)?
        };
        bytes.truncate(stream.size);
        Ok(Some(bytes))
    }
}

/// Builds the file allocation table from the header's DIFAT entries plus any DIFAT sectors.
fn load_fat(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, SheetSummaryError> {
    let mut difat: Vec<usize> = to_usize_iter(&sectors.data[76..HEADER_SIZE]).collect();
    let mut next = header.difat_start;
    let mut visited = 0usize;
    while next <= MAX_REGULAR_SECTOR && visited < header.difat_count {
        let sector = sectors.get(next)?;
        let mut entries: Vec<usize> = to_usize_iter(sector).collect();
        // The last entry of a DIFAT sector chains to the next one
        next = entries.pop().ok_or(CfbError::FileFormatError)?;
        difat.extend(entries);
        visited += 1;
    }

    let mut fat = Vec::new();
    let mut count = 0usize;
    for index in difat.into_iter().filter(|index| *index <= MAX_REGULAR_SECTOR) {
        fat.extend(to_usize_iter(sectors.get(index)?));
        count += 1;
    }
    if count != header.fat_count {
        Err(CfbError::FileAllocationTableError(header.fat_count, count))?
    }
    Ok(fat)
}

fn load_streams(fat: &[usize], sectors: &Sectors, start: usize) -> Result<HashMap<String, Stream>, SheetSummaryError> {
    let bytes = read_chain(fat, sectors, start)?;
    let streams: HashMap<String, Stream> = bytes
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .map(Stream::parse)
        .filter(|(name, _)| !name.is_empty())
        .collect();
    if streams.is_empty() {
        Err(CfbError::RootDirectoryError)?
    }
    Ok(streams)
}

/// Concatenates the sectors of the chain starting at `start`.
fn read_chain(table: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, SheetSummaryError> {
    let mut content = Vec::new();
    let mut index = start;
    let mut steps = 0usize;
    while index <= MAX_REGULAR_SECTOR {
        content.extend_from_slice(sectors.get(index)?);
        index = *table.get(index).ok_or(CfbError::SectorOutOfBoundsError(index))?;
        steps += 1;
        if steps > table.len() {
            Err(CfbError::SectorChainError(start))?
        }
    }
    Ok(content)
}

struct Sectors {
    data: Vec<u8>,
    size: usize,
    /// Regular sectors are numbered from the end of the header; mini sectors from zero.
    offset: usize,
}

impl Sectors {
    fn mini(data: Vec<u8>) -> Sectors {
        Sectors {
            data,
            size: MINI_SECTOR_SIZE,
            offset: 0,
        }
    }

    fn get(&self, index: usize) -> Result<&[u8], SheetSummaryError> {
        let begin = (index + self.offset) * self.size;
        let end = self.data.len().min(begin + self.size);
        if begin >= end {
            Err(CfbError::SectorOutOfBoundsError(index))?
        }
        Ok(&self.data[begin..end])
    }
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    fat_count: usize,
    directory_start: usize,
    mini_fat_start: usize,
    mini_fat_count: usize,
    difat_start: usize,
    difat_count: usize,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Header, SheetSummaryError> {
        if !has_signature(data) {
            Err(CfbError::OleSignatureError)?;
        }
        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            fat_count: to_usize(&data[44..48]),
            directory_start: to_usize(&data[48..52]),
            mini_fat_start: to_usize(&data[60..64]),
            mini_fat_count: to_usize(&data[64..68]),
            difat_start: to_usize(&data[68..72]),
            difat_count: to_usize(&data[72..76]),
        })
    }

    fn sector_size(&self) -> Result<usize, SheetSummaryError> {
        match (self.major_version, self.sector_shift) {
            (3, 0x0009) => Ok(512),
            // Version 4 pads the 512-byte header with zeroes up to a full 4096-byte sector
            (4, 0x000C) => Ok(4096),
            (version, shift) => Err(CfbError::SectorSizeError(version, shift))?,
        }
    }
}

/// Directory entry of a stream or storage.
struct Stream {
    /// First sector, regular or mini depending on `size`
    start: usize,
    /// Length in bytes
    size: usize,
}

impl Stream {
    fn parse(entry: &[u8]) -> (String, Stream) {
        let length = (to_u16(&entry[64..66]) as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&entry[..length]);
        let name = name.split('\0').next().unwrap_or_default().to_owned();
        let stream = Stream {
            start: to_usize(&entry[116..120]),
            size: to_u64(&entry[120..128]) as usize,
        };
        (name, stream)
    }
}
