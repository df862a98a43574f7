//! Request builders for the organization device-management resources.
//!
//! Responses are left to the caller's own `Deserialize` types; these helpers only know paths,
//! query conventions, and the JSON:API envelope used by device activities.

// crates.io
use serde_json::{Value, json};
// self
use crate::{_prelude::*, api::RequestSpec};

/// Collection of organization devices.
pub const ORG_DEVICES: &str = "/v1/orgDevices";
/// Collection of device-management servers.
pub const MDM_SERVERS: &str = "/v1/mdmServers";
/// Collection of device activities.
pub const ORG_DEVICE_ACTIVITIES: &str = "/v1/orgDeviceActivities";

/// Page size requested by list helpers; the server caps it anyway.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Kind of bulk assignment carried by a device activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
	/// Assign devices to a device-management server.
	AssignDevices,
	/// Release devices from their device-management server.
	UnassignDevices,
}
impl ActivityType {
	/// Wire label of the activity.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AssignDevices => "ASSIGN_DEVICES",
			Self::UnassignDevices => "UNASSIGN_DEVICES",
		}
	}
}
impl Display for ActivityType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Lists organization devices.
pub fn list_devices() -> RequestSpec {
	RequestSpec::get(ORG_DEVICES).with_query("limit", DEFAULT_PAGE_SIZE.to_string())
}

/// Reads one organization device by serial number.
pub fn get_device(device_id: &str) -> RequestSpec {
	RequestSpec::get(format!("{ORG_DEVICES}/{}", segment(device_id)))
}

/// Reads the AppleCare coverage of a device.
pub fn device_apple_care_coverage(device_id: &str) -> RequestSpec {
	RequestSpec::get(format!("{ORG_DEVICES}/{}/appleCareCoverage", segment(device_id)))
}

/// Reads the device-management server a device is assigned to.
pub fn device_assigned_server(device_id: &str) -> RequestSpec {
	RequestSpec::get(format!("{ORG_DEVICES}/{}/relationships/assignedServer", segment(device_id)))
}

/// Lists device-management servers.
pub fn list_mdm_servers() -> RequestSpec {
	RequestSpec::get(MDM_SERVERS).with_query("limit", DEFAULT_PAGE_SIZE.to_string())
}

/// Lists the device linkages of one device-management server.
pub fn list_server_devices(server_id: &str) -> RequestSpec {
	RequestSpec::get(format!("{MDM_SERVERS}/{}/relationships/devices", segment(server_id)))
		.with_query("limit", DEFAULT_PAGE_SIZE.to_string())
}

/// Reads the status of a previously submitted device activity.
pub fn get_device_activity(activity_id: &str) -> RequestSpec {
	RequestSpec::get(format!("{ORG_DEVICE_ACTIVITIES}/{}", segment(activity_id)))
}

/// Submits an assign/unassign activity for `device_ids` against `server_id`.
pub fn device_activity<I, S>(activity: ActivityType, server_id: &str, device_ids: I) -> RequestSpec
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	RequestSpec::post(ORG_DEVICE_ACTIVITIES, activity_envelope(activity, server_id, device_ids))
}

/// Restricts the attributes returned for `resource_type`, e.g. `fields[orgDevices]=a,b`.
pub fn with_fields<I, S>(spec: RequestSpec, resource_type: &str, fields: I) -> RequestSpec
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let joined = fields.into_iter().map(|field| field.as_ref().to_owned()).collect::<Vec<_>>();

	if joined.is_empty() {
		return spec;
	}

	spec.with_query(format!("fields[{resource_type}]"), joined.join(","))
}

fn activity_envelope<I, S>(activity: ActivityType, server_id: &str, device_ids: I) -> Value
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let devices = device_ids
		.into_iter()
		.map(|id| json!({ "type": "orgDevices", "id": id.as_ref() }))
		.collect::<Vec<_>>();

	json!({
		"data": {
			"type": "orgDeviceActivities",
			"attributes": { "activityType": activity.as_str() },
			"relationships": {
				"mdmServer": { "data": { "type": "mdmServers", "id": server_id } },
				"devices": { "data": devices },
			},
		},
	})
}

fn segment(raw: &str) -> String {
	url::form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>().replace('+', "%20")
}
