//! zbus proxies for the parts of the systemd manager API in use.

use zbus::zvariant::OwnedObjectPath;

/// `(unit, type, state)` per change from `EnableUnitFiles`/`DisableUnitFiles`.
pub type UnitFileChange = (String, String, String);

/// `(id, unit, type, state, job path, unit path)`.
pub type RawJob = (u32, String, String, String, OwnedObjectPath, OwnedObjectPath);

/// `(name, description, load, active, sub, following, unit path, job id, job type, job path)`.
pub type RawUnit = (
    String,
    String,
    String,
    String,
    String,
    String,
    OwnedObjectPath,
    u32,
    String,
    OwnedObjectPath,
);

#[zbus::proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1"
)]
pub trait Manager {
    fn load_unit(&self, name: &str) -> zbus::Result<OwnedObjectPath>;

    fn enable_unit_files(
        &self,
        files: &[&str],
        runtime: bool,
        force: bool,
    ) -> zbus::Result<(bool, Vec<UnitFileChange>)>;

    fn disable_unit_files(&self, files: &[&str], runtime: bool)
    -> zbus::Result<Vec<UnitFileChange>>;

    fn reload(&self) -> zbus::Result<()>;

    fn list_jobs(&self) -> zbus::Result<Vec<RawJob>>;

    fn list_units(&self) -> zbus::Result<Vec<RawUnit>>;
}

#[zbus::proxy(
    interface = "org.freedesktop.systemd1.Unit",
    default_service = "org.freedesktop.systemd1"
)]
pub trait Unit {
    #[zbus(property)]
    fn unit_file_state(&self) -> zbus::Result<String>;
}
