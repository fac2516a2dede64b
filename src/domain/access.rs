//! Access Context - 诊所角色与权限
//!
//! 每个用户通过 ClinicAccess 在某个诊所内拥有一个角色，
//! 角色决定其可执行的操作集合

use super::macros::string_enum;

string_enum! {
    /// 诊所内角色
    pub enum ClinicRole: "role" {
        Owner => "OWNER",
        Veterinarian => "VETERINARIAN",
        Staff => "STAFF",
        Viewer => "VIEWER",
    }
}

/// 诊所内的操作权限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ManageClinic,
    ManageMembers,
    ViewClinic,
    WritePatients,
    WriteAppointments,
    WriteMedicalRecords,
    WriteInvoices,
    WriteProducts,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageClinic => "manage_clinic",
            Permission::ManageMembers => "manage_members",
            Permission::ViewClinic => "view_clinic",
            Permission::WritePatients => "write_patients",
            Permission::WriteAppointments => "write_appointments",
            Permission::WriteMedicalRecords => "write_medical_records",
            Permission::WriteInvoices => "write_invoices",
            Permission::WriteProducts => "write_products",
        }
    }
}

impl ClinicRole {
    /// 角色是否拥有指定权限
    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;

        match self {
            ClinicRole::Owner => true,
            ClinicRole::Veterinarian => matches!(
                permission,
                ViewClinic | WritePatients | WriteAppointments | WriteMedicalRecords | WriteInvoices
            ),
            ClinicRole::Staff => matches!(
                permission,
                ViewClinic | WritePatients | WriteAppointments | WriteInvoices | WriteProducts
            ),
            ClinicRole::Viewer => matches!(permission, ViewClinic),
        }
    }

    /// 是否可以作为预约的接诊兽医
    pub fn can_attend_appointments(&self) -> bool {
        matches!(self, ClinicRole::Owner | ClinicRole::Veterinarian)
    }
}
