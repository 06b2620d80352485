use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use serde::Deserialize;

/// One row of the invocation file: `org,function,arg1,arg2,arg3`.
#[derive(Debug, Deserialize)]
pub struct Invocation {
    pub org: Option<String>,
    pub function: String,
    pub arg1: Option<String>,
    pub arg2: Option<String>,
    pub arg3: Option<String>,
}

impl Invocation {
    /// Leading arguments up to the first empty column.
    pub fn args(&self) -> Vec<&str> {
        [&self.arg1, &self.arg2, &self.arg3]
            .into_iter()
            .map_while(|arg| arg.as_deref())
            .collect()
    }
}

/// Parses an invocation list in CSV format, yielding each row with its line number.
pub struct CsvInvocationParser<R> {
    iter: DeserializeRecordsIntoIter<R, Invocation>,
}

impl<R> CsvInvocationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvInvocationParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Invocation, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
