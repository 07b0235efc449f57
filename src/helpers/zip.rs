//! Entry lookup for the ZIP containers behind `.xlsx` and `.ods` files

use crate::error::CfoError;
use crate::helpers::xml::XmlEvents;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipEntries<R: Read + Seek> {
    /// Entry named `name`, matched case-insensitively with `\` read as `/`
    fn entry(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, R>>, CfoError>;

    /// XML event reader over the entry named `name`
    fn xml_events(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlEvents<BufReader<ZipFile<'_, R>>>>, CfoError>;
}

impl<R: Read + Seek> ZipEntries<R> for ZipArchive<R> {
    fn entry(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, R>>, CfoError> {
        let wanted = name.replace('\\', "/");
        let Some(path) = self
            .file_names()
            .find(|candidate| wanted.eq_ignore_ascii_case(candidate))
            .map(str::to_owned)
        else {
            return Ok(None);
        };
        match self.by_name(&path) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_events(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlEvents<BufReader<ZipFile<'_, R>>>>, CfoError> {
        Ok(self
            .entry(name)?
            .map(|file| XmlEvents::new(BufReader::new(file))))
    }
}
