//! Persistence gateway.
//!
//! Services talk to storage through the [`Gateway`] trait; [`MemoryGateway`] is the
//! in-process implementation, holding its tables behind a lock and optionally
//! snapshotting them to a JSON data file after every mutation. The deployment is a
//! single small-district instance, so a full-file snapshot per write is well within
//! budget and keeps recovery trivial: the file is the whole database.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::account::{NewUserRecord, User, UserPatchRecord};
use crate::appointment::{Appointment, AppointmentStatus, DateRange, NewAppointment};
use crate::home_opd::{HomeOpdEntry, HomeOpdSource, NewHomeOpdEntry};
use crate::patient::{NewPatient, Patient};
use crate::triage::VitalReadings;
use crate::{ReferError, ReferResult};

/// Storage operations the services depend on.
pub trait Gateway: Send + Sync {
    fn list_patients(&self) -> ReferResult<Vec<Patient>>;
    fn find_patient(&self, id: i64) -> ReferResult<Option<Patient>>;
    fn find_patient_by_hn(&self, hn: &str) -> ReferResult<Option<Patient>>;
    fn find_patient_by_cid(&self, cid: &str) -> ReferResult<Option<Patient>>;
    fn insert_patient(&self, new: NewPatient) -> ReferResult<Patient>;
    fn update_patient(&self, id: i64, new: NewPatient) -> ReferResult<Patient>;
    /// Deletes the patient and every appointment that references it.
    fn delete_patient(&self, id: i64) -> ReferResult<()>;

    fn list_appointments(&self, range: &DateRange) -> ReferResult<Vec<Appointment>>;
    fn find_appointment(&self, id: i64) -> ReferResult<Option<Appointment>>;
    fn insert_appointment(&self, new: NewAppointment) -> ReferResult<Appointment>;
    fn store_readings(&self, id: i64, readings: &VitalReadings) -> ReferResult<()>;
    fn transition_appointment(
        &self,
        id: i64,
        status: AppointmentStatus,
        refer_back_note: Option<String>,
    ) -> ReferResult<Appointment>;
    fn update_appointment_schedule(
        &self,
        id: i64,
        date: Option<NaiveDate>,
        note: Option<String>,
    ) -> ReferResult<Appointment>;
    fn delete_appointment(&self, id: i64) -> ReferResult<()>;

    fn list_users(&self) -> ReferResult<Vec<User>>;
    fn find_user(&self, id: i64) -> ReferResult<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> ReferResult<Option<User>>;
    fn insert_user(&self, new: NewUserRecord) -> ReferResult<User>;
    fn update_user(&self, id: i64, patch: UserPatchRecord) -> ReferResult<User>;
    fn delete_user(&self, id: i64) -> ReferResult<()>;

    fn list_home_opd(&self) -> ReferResult<Vec<HomeOpdEntry>>;
    fn insert_home_opd(
        &self,
        new: NewHomeOpdEntry,
        source: HomeOpdSource,
        location: Option<String>,
        created_at: String,
    ) -> ReferResult<HomeOpdEntry>;
}

/// Everything the gateway stores, in snapshot form.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    users: Vec<User>,
    home_opd: Vec<HomeOpdEntry>,
    next_patient_id: i64,
    next_appointment_id: i64,
    next_user_id: i64,
    next_home_opd_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// In-process gateway with optional JSON snapshot persistence.
pub struct MemoryGateway {
    tables: RwLock<Tables>,
    data_file: Option<PathBuf>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// Ephemeral gateway, nothing written to disk. Tests and the demo profile.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            data_file: None,
        }
    }

    /// Gateway backed by a JSON data file. Loads the file if it exists, otherwise
    /// starts empty and creates it on first write.
    pub fn with_data_file(path: impl Into<PathBuf>) -> ReferResult<Self> {
        let path = path.into();
        let tables = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| ReferError::Gateway(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&raw)
                .map_err(|e| ReferError::Gateway(format!("parse {}: {e}", path.display())))?
        } else {
            Tables::default()
        };

        Ok(Self {
            tables: RwLock::new(tables),
            data_file: Some(path),
        })
    }

    fn read(&self) -> ReferResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| ReferError::Gateway("state lock poisoned".into()))
    }

    fn write(&self) -> ReferResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| ReferError::Gateway("state lock poisoned".into()))
    }

    /// Snapshot the tables to the data file, if one is configured. Writes to a
    /// sibling temp file first and renames it into place, so a crash mid-write
    /// never leaves a truncated snapshot.
    fn persist(&self, tables: &Tables) -> ReferResult<()> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(tables)
            .map_err(|e| ReferError::Gateway(format!("serialize snapshot: {e}")))?;

        let tmp = snapshot_tmp_path(path);
        fs::write(&tmp, json)
            .map_err(|e| ReferError::Gateway(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .map_err(|e| ReferError::Gateway(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }
}

fn snapshot_tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl Gateway for MemoryGateway {
    fn list_patients(&self) -> ReferResult<Vec<Patient>> {
        Ok(self.read()?.patients.clone())
    }

    fn find_patient(&self, id: i64) -> ReferResult<Option<Patient>> {
        Ok(self.read()?.patients.iter().find(|p| p.id == id).cloned())
    }

    fn find_patient_by_hn(&self, hn: &str) -> ReferResult<Option<Patient>> {
        Ok(self.read()?.patients.iter().find(|p| p.hn == hn).cloned())
    }

    fn find_patient_by_cid(&self, cid: &str) -> ReferResult<Option<Patient>> {
        Ok(self.read()?.patients.iter().find(|p| p.cid == cid).cloned())
    }

    fn insert_patient(&self, new: NewPatient) -> ReferResult<Patient> {
        let mut tables = self.write()?;

        if tables.patients.iter().any(|p| p.hn == new.hn) {
            return Err(ReferError::Conflict("HN already exists".into()));
        }
        if tables.patients.iter().any(|p| p.cid == new.cid) {
            return Err(ReferError::Conflict("CID already exists".into()));
        }

        let id = Tables::next_id(&mut tables.next_patient_id);
        let patient = Patient {
            id,
            hn: new.hn,
            name: new.name,
            cid: new.cid,
            phone: new.phone,
            medical_rights: new.medical_rights,
            clinic: new.clinic,
            house_no: new.house_no,
            moo: new.moo,
            tumbol: new.tumbol,
            amphoe: new.amphoe,
            province: new.province,
            hc_zone: new.hc_zone,
        };
        tables.patients.push(patient.clone());
        self.persist(&tables)?;
        Ok(patient)
    }

    fn update_patient(&self, id: i64, new: NewPatient) -> ReferResult<Patient> {
        let mut tables = self.write()?;

        if tables.patients.iter().any(|p| p.id != id && p.hn == new.hn) {
            return Err(ReferError::Conflict("HN already exists".into()));
        }
        if tables.patients.iter().any(|p| p.id != id && p.cid == new.cid) {
            return Err(ReferError::Conflict("CID already exists".into()));
        }

        let patient = tables
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ReferError::NotFound("patient"))?;

        patient.hn = new.hn;
        patient.name = new.name;
        patient.cid = new.cid;
        patient.phone = new.phone;
        patient.medical_rights = new.medical_rights;
        patient.clinic = new.clinic;
        patient.house_no = new.house_no;
        patient.moo = new.moo;
        patient.tumbol = new.tumbol;
        patient.amphoe = new.amphoe;
        patient.province = new.province;
        patient.hc_zone = new.hc_zone;
        let patient = patient.clone();

        self.persist(&tables)?;
        Ok(patient)
    }

    fn delete_patient(&self, id: i64) -> ReferResult<()> {
        let mut tables = self.write()?;

        let before = tables.patients.len();
        tables.patients.retain(|p| p.id != id);
        if tables.patients.len() == before {
            return Err(ReferError::NotFound("patient"));
        }
        tables.appointments.retain(|a| a.patient_id != id);

        self.persist(&tables)?;
        Ok(())
    }

    fn list_appointments(&self, range: &DateRange) -> ReferResult<Vec<Appointment>> {
        Ok(self
            .read()?
            .appointments
            .iter()
            .filter(|a| range.contains(a.appointment_date))
            .cloned()
            .collect())
    }

    fn find_appointment(&self, id: i64) -> ReferResult<Option<Appointment>> {
        Ok(self
            .read()?
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    fn insert_appointment(&self, new: NewAppointment) -> ReferResult<Appointment> {
        let mut tables = self.write()?;

        let id = Tables::next_id(&mut tables.next_appointment_id);
        let appointment = Appointment {
            id,
            patient_id: new.patient_id,
            appointment_date: new.appointment_date,
            note: new.note,
            req_bp: new.req_bp,
            req_bs: new.req_bs,
            status: AppointmentStatus::Pending,
            bp_sys: None,
            bp_dia: None,
            bp_sys_2: None,
            bp_dia_2: None,
            blood_sugar: None,
            refer_back_note: None,
        };
        tables.appointments.push(appointment.clone());
        self.persist(&tables)?;
        Ok(appointment)
    }

    fn store_readings(&self, id: i64, readings: &VitalReadings) -> ReferResult<()> {
        let mut tables = self.write()?;

        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ReferError::NotFound("appointment"))?;

        appointment.bp_sys = readings.sys1;
        appointment.bp_dia = readings.dia1;
        appointment.bp_sys_2 = readings.sys2;
        appointment.bp_dia_2 = readings.dia2;
        appointment.blood_sugar = readings.blood_sugar;

        self.persist(&tables)?;
        Ok(())
    }

    fn transition_appointment(
        &self,
        id: i64,
        status: AppointmentStatus,
        refer_back_note: Option<String>,
    ) -> ReferResult<Appointment> {
        let mut tables = self.write()?;

        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ReferError::NotFound("appointment"))?;

        appointment.status = status;
        appointment.refer_back_note = refer_back_note;
        let appointment = appointment.clone();

        self.persist(&tables)?;
        Ok(appointment)
    }

    fn update_appointment_schedule(
        &self,
        id: i64,
        date: Option<NaiveDate>,
        note: Option<String>,
    ) -> ReferResult<Appointment> {
        let mut tables = self.write()?;

        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ReferError::NotFound("appointment"))?;

        if let Some(date) = date {
            appointment.appointment_date = date;
        }
        if let Some(note) = note {
            appointment.note = Some(note);
        }
        let appointment = appointment.clone();

        self.persist(&tables)?;
        Ok(appointment)
    }

    fn delete_appointment(&self, id: i64) -> ReferResult<()> {
        let mut tables = self.write()?;

        let before = tables.appointments.len();
        tables.appointments.retain(|a| a.id != id);
        if tables.appointments.len() == before {
            return Err(ReferError::NotFound("appointment"));
        }

        self.persist(&tables)?;
        Ok(())
    }

    fn list_users(&self) -> ReferResult<Vec<User>> {
        Ok(self.read()?.users.clone())
    }

    fn find_user(&self, id: i64) -> ReferResult<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> ReferResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn insert_user(&self, new: NewUserRecord) -> ReferResult<User> {
        let mut tables = self.write()?;

        if tables.users.iter().any(|u| u.username == new.username) {
            return Err(ReferError::Conflict("username already exists".into()));
        }

        let id = Tables::next_id(&mut tables.next_user_id);
        let user = User {
            id,
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            location_name: new.location_name,
            name: new.name,
            position: new.position,
        };
        tables.users.push(user.clone());
        self.persist(&tables)?;
        Ok(user)
    }

    fn update_user(&self, id: i64, patch: UserPatchRecord) -> ReferResult<User> {
        let mut tables = self.write()?;

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ReferError::NotFound("user"))?;

        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(location) = patch.location_name {
            user.location_name = Some(location);
        }
        if let Some(name) = patch.name {
            user.name = Some(name);
        }
        if let Some(position) = patch.position {
            user.position = Some(position);
        }
        let user = user.clone();

        self.persist(&tables)?;
        Ok(user)
    }

    fn delete_user(&self, id: i64) -> ReferResult<()> {
        let mut tables = self.write()?;

        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(ReferError::NotFound("user"));
        }

        self.persist(&tables)?;
        Ok(())
    }

    fn list_home_opd(&self) -> ReferResult<Vec<HomeOpdEntry>> {
        Ok(self.read()?.home_opd.clone())
    }

    fn insert_home_opd(
        &self,
        new: NewHomeOpdEntry,
        source: HomeOpdSource,
        location: Option<String>,
        created_at: String,
    ) -> ReferResult<HomeOpdEntry> {
        let mut tables = self.write()?;

        let id = Tables::next_id(&mut tables.next_home_opd_id);
        let entry = HomeOpdEntry {
            id,
            patient_id: new.patient_id,
            cid: new.cid,
            name: new.name,
            kind: new.kind,
            note: new.note,
            source,
            location,
            created_at,
        };
        tables.home_opd.push(entry.clone());
        self.persist(&tables)?;
        Ok(entry)
    }
}
