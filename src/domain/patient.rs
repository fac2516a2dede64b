//! Patient Context - 患宠档案值对象

use chrono::NaiveDate;

use super::macros::string_enum;
use super::DomainError;

string_enum! {
    /// 物种
    pub enum Species: "species" {
        Dog => "DOG",
        Cat => "CAT",
        Bird => "BIRD",
        Rabbit => "RABBIT",
        Reptile => "REPTILE",
        Rodent => "RODENT",
        Horse => "HORSE",
        Other => "OTHER",
    }
}

string_enum! {
    /// 性别
    #[derive(Default)]
    pub enum Sex: "sex" {
        Male => "MALE",
        Female => "FEMALE",
        #[default]
        Unknown => "UNKNOWN",
    }
}

/// 出生日期不能晚于今天
pub fn validate_birth_date(
    birth_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, DomainError> {
    match birth_date {
        Some(date) if date > today => Err(DomainError::invalid(
            "birth_date",
            "cannot be in the future",
        )),
        other => Ok(other),
    }
}

/// 芯片号：去掉空白后 9-20 位字母数字
pub fn normalize_microchip(raw: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let chip: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if chip.is_empty() {
        return Ok(None);
    }
    if !(9..=20).contains(&chip.len()) || !chip.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::invalid(
            "microchip_id",
            "must be 9 to 20 alphanumeric characters",
        ));
    }
    Ok(Some(chip.to_uppercase()))
}
