//! Template text for labor line descriptions and scope-of-work narratives.

use crate::domain::device::{display_name, normalize_category};

fn category_tasks(category: &str) -> &'static [&'static str] {
    match category {
        "smart_lock" => &[
            "Remove existing deadbolt hardware and inspect door prep",
            "Mount lock assembly and align bolt with strike plate",
            "Pair lock with the property hub and enroll access codes",
            "Verify manual key, keypad, and remote lock/unlock operation",
        ],
        "thermostat" => &[
            "Power down HVAC circuit and document existing wiring",
            "Mount thermostat base and land conductors, adding common wire if required",
            "Configure heating/cooling stages and schedules",
            "Run a heating and cooling cycle to confirm operation",
        ],
        "hub" | "controller" => &[
            "Select central mounting location with network access",
            "Connect controller to the property network and power",
            "Update firmware and create the property automation account",
            "Confirm remote access from the management portal",
        ],
        "camera" => &[
            "Survey coverage angles and confirm mounting locations",
            "Run and terminate network cabling to each location",
            "Mount and weatherproof camera housings",
            "Adjust field of view, motion zones, and recording settings",
        ],
        "doorbell" => &[
            "Inspect existing doorbell transformer and chime",
            "Mount video doorbell with wedge kit as needed",
            "Connect to Wi-Fi and link to resident notifications",
            "Test chime, video, and two-way audio",
        ],
        "sensor" | "leak_detector" => &[
            "Identify placement points per manufacturer guidance",
            "Mount sensors and install batteries",
            "Pair sensors with the hub and name by location",
            "Trigger each sensor and confirm alerts arrive",
        ],
        "switch" | "outlet" => &[
            "De-energize circuit and verify absence of voltage",
            "Replace device and land line, load, and neutral conductors",
            "Install wall plate and restore power",
            "Pair with hub and verify local and remote control",
        ],
        "garage_door" => &[
            "Mount controller near opener and position door tilt sensor",
            "Wire controller to opener terminals",
            "Pair with hub and configure open/close alerts",
            "Cycle door and confirm safety reversal still operates",
        ],
        "shade" => &[
            "Measure window openings and confirm bracket placement",
            "Mount brackets and hang motorized shades",
            "Set upper and lower limits",
            "Pair shades with hub and create scene groups",
        ],
        "irrigation" => &[
            "Remove existing timer and label zone wires",
            "Mount smart controller and land zone conductors",
            "Configure zones, soil types, and watering schedule",
            "Run each zone to verify valve operation",
        ],
        "smoke_detector" => &[
            "Confirm placement meets local code requirements",
            "Mount detector base and connect interconnect wiring where present",
            "Pair with hub for remote alerts",
            "Run detector self-test and verify notification delivery",
        ],
        _ => &[
            "Confirm installation location with the property manager",
            "Mount and connect device per manufacturer instructions",
            "Pair device with the property hub",
            "Verify operation and record device details",
        ],
    }
}

fn units(quantity: u32) -> &'static str {
    if quantity == 1 {
        "unit"
    } else {
        "units"
    }
}

pub fn device_description(category: &str, quantity: u32, vendor: Option<&str>) -> String {
    let name = display_name(category);
    match vendor {
        Some(vendor) => {
            format!("Install and configure {quantity} {vendor} {name} {}", units(quantity))
        }
        None => format!("Install and configure {quantity} {name} {}", units(quantity)),
    }
}

pub fn device_scope_of_work(category: &str, quantity: u32) -> String {
    let key = normalize_category(category);
    let name = display_name(&key);
    let mut text = format!("SCOPE OF WORK: {name} Installation ({quantity} {})\n\n", units(quantity));

    text.push_str("Tasks:\n");
    for task in category_tasks(&key) {
        text.push_str("- ");
        text.push_str(task);
        text.push('\n');
    }

    text.push_str("\nDeliverables:\n");
    text.push_str(&format!(
        "- {quantity} {name} {} installed, paired, and verified operational\n",
        units(quantity)
    ));
    text.push_str("- Device locations recorded in the property device inventory\n");

    text.push_str("\nExclusions:\n");
    text.push_str("- Repair of pre-existing structural, electrical, or network defects\n");
    text
}

pub fn configuration_scope(total_devices: u32) -> String {
    format!(
        "SCOPE OF WORK: System Configuration ({total_devices} devices)\n\n\
         Tasks:\n\
         - Create rooms, zones, and device names in the automation platform\n\
         - Build scenes and schedules agreed with the property manager\n\
         - Configure alerts, user accounts, and access permissions\n\n\
         Deliverables:\n\
         - All {total_devices} devices organized and reachable from the management portal\n"
    )
}

pub fn testing_scope(total_devices: u32) -> String {
    format!(
        "SCOPE OF WORK: System Testing ({total_devices} devices)\n\n\
         Tasks:\n\
         - Functional test of every installed device\n\
         - End-to-end test of scenes, schedules, and alerts\n\
         - Verify remote access and connectivity under normal network load\n\n\
         Deliverables:\n\
         - Test checklist covering all {total_devices} devices, signed off on completion\n"
    )
}

pub fn training_scope(total_devices: u32) -> String {
    format!(
        "SCOPE OF WORK: Owner & Staff Training ({total_devices} devices)\n\n\
         Tasks:\n\
         - Walkthrough of the mobile app and management portal\n\
         - Hands-on practice with locks, climate, and alert handling\n\
         - Review of support contacts and troubleshooting steps\n\n\
         Deliverables:\n\
         - Printed system manual and quick-reference cards\n"
    )
}
