use std::{
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use fs_err::File;
use log::info;

use crate::schema::{Table, TableRow};

pub const DELIMITER: u8 = b';';

/// Writes `table` to `path`, replacing any previous export.
/// Missing parent directories are created.
pub fn write_table<R: TableRow>(table: &Table<R>, path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs_err::create_dir_all(dir)?;
    }
    write_table_to(BufWriter::new(File::create(path)?), table)
        .with_context(|| format!("While writing {path:?}"))?;
    info!("Exported {} rows to {path:?}", table.len());
    Ok(())
}

/// Header row first, then one record per row, `;`-separated.
pub fn write_table_to<W: Write, R: TableRow>(writer: W, table: &Table<R>) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(writer);
    writer.write_record(R::HEADER)?;
    for row in table {
        writer.write_record(row.record())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use arrayvec::ArrayVec;

    use super::{write_table, write_table_to};
    use crate::schema::{MainRow, Table, VideocardRow};

    fn main_table() -> Table<MainRow> {
        [
            ("GPU", Some("Nvidia"), "RTX 4090", 0.0123, 0.0005),
            ("Language", None, "English; US", 0.35, -0.01),
        ]
        .into_iter()
        .map(|(category, group, entry, usage, change)| {
            MainRow::builder()
                .category(category.to_owned().into())
                .group(group.map(|x: &str| x.to_owned().into()))
                .entry(entry.to_owned().into())
                .usage(usage)
                .change(change)
                .build()
        })
        .collect()
    }

    fn to_string<R: crate::schema::TableRow>(table: &Table<R>) -> String {
        let mut buffer = vec![];
        write_table_to(&mut buffer, table).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn main_survey_layout() {
        assert_eq!(
            to_string(&main_table()),
            "Category;Group;Entry;Usage_%;Evolution_%\n\
             GPU;Nvidia;RTX 4090;0.0123;0.0005\n\
             Language;;\"English; US\";0.35;-0.01\n"
        );
    }

    #[test]
    fn videocard_layout() {
        let table = [vec![0.01, 0.02, 0.03, 0.04, 0.05, 0.0], vec![0.5, 0.1]]
            .into_iter()
            .map(|values| {
                VideocardRow::builder()
                    .subcategory("All".to_owned().into())
                    .entry("GTX 1650".to_owned().into())
                    .values(values.into_iter().collect::<ArrayVec<_, 6>>())
                    .build()
            })
            .collect::<Table<_>>();
        assert_eq!(
            to_string(&table),
            "Subcategory;Entry;Month-4;Month-3;Month-2;Month-1;Month;MonthChange_%\n\
             All;GTX 1650;0.01;0.02;0.03;0.04;0.05;0.0\n\
             All;GTX 1650;;;;;0.5;0.1\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let table = std::iter::empty::<MainRow>().collect::<Table<_>>();
        assert_eq!(to_string(&table), "Category;Group;Entry;Usage_%;Evolution_%\n");
    }

    #[test]
    fn file_is_created_then_overwritten() {
        let dir = std::env::temp_dir().join(format!("hwsurvey-export-{}", std::process::id()));
        let path = dir.join("nested").join("MainSurvey.csv");
        write_table(&main_table(), &path).unwrap();
        let first = fs_err::read_to_string(&path).unwrap();
        assert_eq!(first.lines().count(), 3);

        let single = main_table().rows()[..1].iter().cloned().collect::<Table<_>>();
        write_table(&single, &path).unwrap();
        assert_eq!(fs_err::read_to_string(&path).unwrap().lines().count(), 2);
        fs_err::remove_dir_all(&dir).unwrap();
    }
}
