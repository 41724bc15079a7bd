//! 学期排序
//!
//! 学期名形如 "Fall 2021"：第一个字段为季节，第二个字段为年份。

use std::str::FromStr;

use crate::models::transcript::Semester;

/// 学年内的季节，判别值即排序序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Spring = 1,
    Summer = 2,
    Fall = 3,
}

impl Season {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl FromStr for Season {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" => Ok(Season::Fall),
            _ => Err(()),
        }
    }
}

/// 派生排序键，不参与存储
#[derive(Debug, Clone, PartialEq)]
pub struct SemesterKey {
    pub semester: Semester,
    pub year: i32,
    pub season: Season,
}

impl SemesterKey {
    /// 解析学期名；字段不足、年份非整数或季节未知时返回 None
    pub fn parse(semester: &Semester) -> Option<Self> {
        let mut fields = semester.name.split_whitespace();
        let season = fields.next()?.parse().ok()?;
        let year = fields.next()?.parse().ok()?;

        Some(Self {
            semester: semester.clone(),
            year,
            season,
        })
    }

    fn sort_key(&self) -> (i32, Season) {
        (self.year, self.season)
    }
}

/// 按 (年份, 季节) 升序稳定排序
///
/// 名称无法解析的学期不出现在结果中。
pub fn order_semesters<'a, I>(semesters: I) -> Vec<SemesterKey>
where
    I: IntoIterator<Item = &'a Semester>,
{
    let mut keys: Vec<SemesterKey> = semesters
        .into_iter()
        .filter_map(SemesterKey::parse)
        .collect();
    keys.sort_by_key(SemesterKey::sort_key);
    keys
}
