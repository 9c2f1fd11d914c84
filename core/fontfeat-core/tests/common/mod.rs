//! Minimal OpenType builders for tests.
//!
//! Just enough structure for read-fonts to parse: a table directory, a
//! format-0 `name` table, an empty `GDEF`, and `GSUB`/`GPOS` tables whose
//! feature lists carry the requested tags. Feature and lookup bodies are empty.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct TestFace {
    pub family: String,
    pub style: String,
    pub gdef: bool,
    pub gsub: Option<Vec<String>>,
    pub gpos: Option<Vec<String>>,
}

impl TestFace {
    pub fn new(family: &str, style: &str) -> Self {
        Self {
            family: family.to_string(),
            style: style.to_string(),
            ..Self::default()
        }
    }

    pub fn gdef(mut self) -> Self {
        self.gdef = true;
        self
    }

    pub fn gsub(mut self, tags: &[&str]) -> Self {
        self.gsub = Some(tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn gpos(mut self, tags: &[&str]) -> Self {
        self.gpos = Some(tags.iter().map(|t| t.to_string()).collect());
        self
    }

    fn tables(&self) -> Vec<([u8; 4], Vec<u8>)> {
        let mut tables = vec![(*b"name", name_table(&self.family, &self.style))];
        if self.gdef {
            tables.push((*b"GDEF", gdef_table()));
        }
        if let Some(tags) = &self.gsub {
            tables.push((*b"GSUB", layout_table(tags)));
        }
        if let Some(tags) = &self.gpos {
            tables.push((*b"GPOS", layout_table(tags)));
        }
        tables.sort_by(|a, b| a.0.cmp(&b.0));
        tables
    }
}

/// A single-face `.ttf`.
pub fn sfnt(face: &TestFace) -> Vec<u8> {
    let mut out = Vec::new();
    let tables = face.tables();
    let data_start = directory_len(tables.len());
    write_directory(&mut out, &tables, data_start);
    for (_, data) in &tables {
        out.extend_from_slice(data);
        pad4(&mut out);
    }
    out
}

/// A `.ttc` collection holding `faces` in order.
pub fn collection(faces: &[TestFace]) -> Vec<u8> {
    let table_sets: Vec<Vec<([u8; 4], Vec<u8>)>> = faces.iter().map(TestFace::tables).collect();

    let header_len = 12 + 4 * faces.len();
    let mut dir_offsets = Vec::new();
    let mut cursor = header_len;
    for tables in &table_sets {
        dir_offsets.push(cursor);
        cursor += directory_len(tables.len());
    }
    let mut data_offsets = Vec::new();
    for tables in &table_sets {
        data_offsets.push(cursor);
        for (_, data) in tables {
            cursor += padded(data.len());
        }
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"ttcf");
    push_u16(&mut out, 1);
    push_u16(&mut out, 0);
    push_u32(&mut out, faces.len() as u32);
    for offset in &dir_offsets {
        push_u32(&mut out, *offset as u32);
    }
    for (tables, data_start) in table_sets.iter().zip(&data_offsets) {
        write_directory(&mut out, tables, *data_start);
    }
    for tables in &table_sets {
        for (_, data) in tables {
            out.extend_from_slice(data);
            pad4(&mut out);
        }
    }
    out
}

pub fn write_font(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(&path, bytes).expect("write font");
    path
}

fn directory_len(num_tables: usize) -> usize {
    12 + 16 * num_tables
}

fn write_directory(out: &mut Vec<u8>, tables: &[([u8; 4], Vec<u8>)], data_start: usize) {
    let num_tables = tables.len() as u16;
    let mut pow2 = 1u16;
    let mut log2 = 0u16;
    while pow2 * 2 <= num_tables.max(1) {
        pow2 *= 2;
        log2 += 1;
    }
    let search_range = pow2 * 16;

    push_u32(out, 0x0001_0000);
    push_u16(out, num_tables);
    push_u16(out, search_range);
    push_u16(out, log2);
    push_u16(out, (num_tables * 16).saturating_sub(search_range));

    let mut offset = data_start;
    for (tag, data) in tables {
        out.extend_from_slice(tag);
        push_u32(out, 0);
        push_u32(out, offset as u32);
        push_u32(out, data.len() as u32);
        offset += padded(data.len());
    }
}

fn name_table(family: &str, style: &str) -> Vec<u8> {
    let strings: Vec<(u16, Vec<u8>)> = [(1u16, family), (2u16, style)]
        .iter()
        .map(|(id, s)| (*id, s.encode_utf16().flat_map(u16::to_be_bytes).collect()))
        .collect();

    let count = strings.len() as u16;
    let mut out = Vec::new();
    push_u16(&mut out, 0);
    push_u16(&mut out, count);
    push_u16(&mut out, 6 + 12 * count);

    let mut offset = 0u16;
    for (id, bytes) in &strings {
        push_u16(&mut out, 3);
        push_u16(&mut out, 1);
        push_u16(&mut out, 0x0409);
        push_u16(&mut out, *id);
        push_u16(&mut out, bytes.len() as u16);
        push_u16(&mut out, offset);
        offset += bytes.len() as u16;
    }
    for (_, bytes) in &strings {
        out.extend_from_slice(bytes);
    }
    out
}

fn gdef_table() -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, 1);
    push_u16(&mut out, 0);
    for _ in 0..4 {
        push_u16(&mut out, 0);
    }
    out
}

/// GSUB/GPOS 1.0: header, empty ScriptList, FeatureList, empty LookupList.
fn layout_table(tags: &[String]) -> Vec<u8> {
    let script_list = 10u16;
    let feature_list = script_list + 2;
    let records_len = 2 + 6 * tags.len() as u16;
    let lookup_list = feature_list + records_len + 4 * tags.len() as u16;

    let mut out = Vec::new();
    push_u16(&mut out, 1);
    push_u16(&mut out, 0);
    push_u16(&mut out, script_list);
    push_u16(&mut out, feature_list);
    push_u16(&mut out, lookup_list);

    // ScriptList
    push_u16(&mut out, 0);

    // FeatureList: records, then one empty Feature table per record.
    push_u16(&mut out, tags.len() as u16);
    for (i, tag) in tags.iter().enumerate() {
        let mut raw = [b' '; 4];
        raw[..tag.len()].copy_from_slice(tag.as_bytes());
        out.extend_from_slice(&raw);
        push_u16(&mut out, records_len + 4 * i as u16);
    }
    for _ in tags {
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
    }

    // LookupList
    push_u16(&mut out, 0);
    out
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
