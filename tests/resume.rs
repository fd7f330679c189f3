use parrot::prelude::*;

mod common;
use common::{scratch_path, Device};

#[test_log::test]
fn failed_replay_resumes_past_completed_commands() {
    let mut proxy = Proxy::setup(Device::default(), SetupConfig::default());
    proxy.call("rename", &[Value::from("first")]).unwrap();
    proxy.call("test1", &[]).unwrap();
    proxy.call("test2", &[]).unwrap();
    let artifact = proxy
        .save(&scratch_path("resume"), &SaveConfig::default())
        .unwrap();

    let mut victim = Device {
        fail_on_call: Some(1),
        ..Device::default()
    };
    let err = Replay::new(&artifact).run(&mut victim).unwrap_err();
    let diag = err.diagnostic().expect("command diagnostic").clone();
    assert!(diag.message.contains("injected failure"));
    assert_eq!(diag.command, "obj.test1(None)");

    // The rename completed before the failure, so the resume artifact
    // re-initializes exactly that attribute and starts at the failing line.
    let resumed = artifact.resumed(&diag);
    assert_eq!(
        resumed.state_init,
        vec![("name".to_owned(), "'first'".to_owned())]
    );
    assert_eq!(resumed.start, diag.line_index);

    let mut fresh = Device::default();
    let report = Replay::new(&resumed).run(&mut fresh).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.executed, 2);
    assert_eq!(fresh.name, "first");
    assert_eq!(fresh.calls, ["test1(None)", "test2(None, 2)"]);
}

#[test_log::test]
fn resume_artifact_survives_its_own_disk_round_trip() {
    let mut proxy = Proxy::setup(Device::default(), SetupConfig::default());
    proxy.call("rename", &[Value::from("kept")]).unwrap();
    proxy.call("test1", &[]).unwrap();
    let artifact = proxy
        .save(&scratch_path("resume-rt"), &SaveConfig::default())
        .unwrap();

    let mut victim = Device {
        fail_on_call: Some(1),
        ..Device::default()
    };
    let err = Replay::new(&artifact).run(&mut victim).unwrap_err();
    let resumed = artifact.resumed(err.diagnostic().unwrap());

    let path = resumed.write(scratch_path("resume-rt-out")).unwrap();
    let reparsed = Artifact::parse(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(reparsed, resumed);
    assert_eq!(reparsed.start, resumed.start);
}
