//! Resource detectors describing the host, operating system, and process.

use opentelemetry::{KeyValue, StringValue, Value};
use opentelemetry_sdk::resource::ResourceDetector;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{
    HOST_ARCH, HOST_NAME, OS_TYPE, PROCESS_COMMAND_ARGS, PROCESS_PID,
};

/// Reports the machine host name and CPU architecture.
#[derive(Debug, Default)]
pub struct HostResourceDetector;

impl ResourceDetector for HostResourceDetector {
    fn detect(&self) -> Resource {
        let mut builder =
            Resource::builder_empty().with_attribute(KeyValue::new(HOST_ARCH, std::env::consts::ARCH));
        if let Some(host_name) = sysinfo::System::host_name() {
            builder = builder.with_attribute(KeyValue::new(HOST_NAME, host_name));
        }
        builder.build()
    }
}

/// Reports the operating system type, e.g. `linux`.
#[derive(Debug, Default)]
pub struct OsResourceDetector;

impl ResourceDetector for OsResourceDetector {
    fn detect(&self) -> Resource {
        Resource::builder_empty()
            .with_attribute(KeyValue::new(OS_TYPE, std::env::consts::OS))
            .build()
    }
}

/// Reports the process id and command line arguments.
#[derive(Debug, Default)]
pub struct ProcessResourceDetector;

impl ResourceDetector for ProcessResourceDetector {
    fn detect(&self) -> Resource {
        let command_args: Vec<StringValue> = std::env::args()
            .map(StringValue::from)
            .collect();
        Resource::builder_empty()
            .with_attributes([
                KeyValue::new(PROCESS_PID, i64::from(std::process::id())),
                KeyValue::new(PROCESS_COMMAND_ARGS, Value::Array(command_args.into())),
            ])
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Key;

    #[test]
    fn os_detector_reports_os_type() {
        let resource = OsResourceDetector.detect();
        assert_eq!(
            resource.get(&Key::from_static_str(OS_TYPE)),
            Some(Value::from(std::env::consts::OS))
        );
    }

    #[test]
    fn process_detector_reports_pid_and_args() {
        let resource = ProcessResourceDetector.detect();
        assert_eq!(
            resource.get(&Key::from_static_str(PROCESS_PID)),
            Some(Value::I64(i64::from(std::process::id())))
        );
        assert!(resource.get(&Key::from_static_str(PROCESS_COMMAND_ARGS)).is_some());
    }

    #[test]
    fn host_detector_reports_architecture() {
        let resource = HostResourceDetector.detect();
        assert_eq!(
            resource.get(&Key::from_static_str(HOST_ARCH)),
            Some(Value::from(std::env::consts::ARCH))
        );
    }
}
