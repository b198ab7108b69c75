//! Lookup of OOXML package parts inside a zip archive.

use crate::error::SheetSummaryError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Opens the part called `name`, or `None` if the package has no such part.
    /// Lookup ignores ASCII case and accepts `\` as a separator.
    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetSummaryError>;

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetSummaryError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetSummaryError> {
        let wanted = name.replace('\\', "/");
        let Some(stored) = self
            .file_names()
            .find(|file_name| wanted.eq_ignore_ascii_case(file_name))
            .map(str::to_owned)
        else {
            return Ok(None);
        };
        match self.by_name(&stored) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetSummaryError> {
        Ok(self.part(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}
