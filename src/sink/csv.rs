use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::RecordSet;

/// Write the record set as delimited text. The header is the union of all
/// record keys; a record without a field gets an empty cell.
pub fn write_records<W: Write>(mut w: W, records: &RecordSet, sep: char) -> io::Result<()> {
    let columns = records.columns();
    write_row(&mut w, columns.iter().copied(), sep)?;
    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).map(|v| v.joined().into_owned()).unwrap_or_default())
            .collect();
        write_row(&mut w, cells.iter().map(String::as_str), sep)?;
    }
    w.flush()
}

pub fn save(path: &Path, records: &RecordSet, sep: char) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(BufWriter::new(file), records, sep)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<'a, W, I>(w: &mut W, cells: I, sep: char) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CharacterRecord, FieldValue};

    fn sample() -> RecordSet {
        RecordSet::finalize(
            vec![
                CharacterRecord::new("Harry Potter", "https://a.test/h")
                    .with_field("Nascimento", FieldValue::text("31 de julho de 1980"))
                    .with_field("Família", FieldValue::list(["Tiago", "Lílian"])),
                CharacterRecord::new("Dobby", "https://a.test/d")
                    .with_field("Espécie", FieldValue::text("Elfo \"livre\"")),
            ],
            "Joanne Rowling",
        )
    }

    fn render(sep: char) -> String {
        let mut out = Vec::new();
        write_records(&mut out, &sample(), sep).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_is_union_and_missing_cells_are_empty() {
        let text = render(';');
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name;source URL;Nascimento;Família;Espécie");
        assert_eq!(lines[1], "Harry Potter;https://a.test/h;31 de julho de 1980;Tiago, Lílian;");
        assert_eq!(lines[2], "Dobby;https://a.test/d;;;\"Elfo \"\"livre\"\"\"");
    }

    #[test]
    fn comma_delimiter_quotes_joined_lists() {
        let text = render(',');
        assert!(text.lines().nth(1).unwrap().ends_with(",\"Tiago, Lílian\","));
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/personagens.csv");
        save(&path, &sample(), ';').unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
