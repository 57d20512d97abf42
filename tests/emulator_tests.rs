#[cfg(test)]
mod emulator_tests {
    use std::io::Cursor;

    use netlab::config::Scenario;
    use netlab::emulator::RecordingShell;
    use netlab::orchestrator::{format_plan, plan_scenario, run_scenario, ConsoleIo};

    const FORWARD_ON: &str = "sysctl net.ipv4.ip_forward=1";
    const FORWARD_OFF: &str = "sysctl net.ipv4.ip_forward=0";

    /// Forwarding is enabled before any route lands and disabled last
    #[test]
    fn test_ip_forwarding_toggle_order() {
        let scenario = Scenario::routers().unwrap();
        let run = run_scenario(&scenario, RecordingShell::new(), None).unwrap();

        for router in ["r1", "r2", "r3", "r4"] {
            let lines = run.shell.lines_for(router);
            let on = lines.iter().position(|l| *l == FORWARD_ON).unwrap();
            let first_route = lines
                .iter()
                .position(|l| l.starts_with("ip route add"))
                .unwrap();
            assert!(on < first_route, "{} routes before forwarding", router);
            assert_eq!(lines.last(), Some(&FORWARD_OFF));
            assert_eq!(lines.iter().filter(|l| **l == FORWARD_ON).count(), 1);
        }
    }

    /// Hosts never have forwarding touched
    #[test]
    fn test_hosts_do_not_forward() {
        let scenario = Scenario::routers().unwrap();
        let run = run_scenario(&scenario, RecordingShell::new(), None).unwrap();
        for host in ["h1", "h2", "h3", "h4"] {
            assert!(!run.shell.lines_for(host).iter().any(|l| l.starts_with("sysctl")));
        }
    }

    /// Each table entry becomes exactly one route command on its router
    #[test]
    fn test_route_commands_verbatim() {
        let scenario = Scenario::routers().unwrap();
        let run = run_scenario(&scenario, RecordingShell::new(), None).unwrap();

        for entry in &scenario.routes {
            let command = entry.command();
            let issued = run
                .shell
                .lines_for(&entry.router)
                .into_iter()
                .filter(|l| *l == command)
                .count();
            assert_eq!(issued, 1, "{}", entry);
        }
        assert!(run
            .shell
            .lines_for("r4")
            .contains(&"ip route add 10.100.0.0/24 via 10.103.0.1 dev r4-eth3 metric 100"));
        assert!(!run
            .shell
            .lines_for("r3")
            .iter()
            .any(|l| l.contains("r4-eth")));
    }

    /// A failing route is reported but the scenario still comes up and down
    #[test]
    fn test_route_failure_not_fatal() {
        let scenario = Scenario::routers().unwrap();
        let shell = RecordingShell::new().fail_on(Some("r3"), "10.100.0.0/24");
        let run = run_scenario(&scenario, shell, None).unwrap();

        assert_eq!(run.routes.failed.len(), 2);
        assert!(run.shell.root_lines().contains(&"ip netns del r3"));
    }

    /// The LAN plan wires the switch to the controller and starts both file servers
    #[test]
    fn test_lan_plan() {
        let scenario = Scenario::lan().unwrap();
        let plan = format_plan(&plan_scenario(&scenario).unwrap());

        assert!(plan.contains("ovs-vsctl set-controller s1 tcp:127.0.0.1:6633"));
        assert!(plan.contains("&h1: sh -c python3 -m http.server 80"));
        assert!(plan.contains("&h2: sh -c python3 -m http.server 80"));
        assert!(!plan.contains("sysctl"));
        assert!(plan.contains("ovs-vsctl --if-exists del-br s1"));
    }

    /// Console commands reach the namespaces until exit
    #[test]
    fn test_console_through_runner() {
        let scenario = Scenario::lan().unwrap();
        let mut input = Cursor::new("pingall\nh3 wget -O - 10.0.0.1\nquit\nh4 true\n");
        let mut output = Vec::new();
        let run = run_scenario(
            &scenario,
            RecordingShell::new(),
            Some(ConsoleIo {
                input: &mut input,
                output: &mut output,
            }),
        )
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("*** Results: 0% dropped (30/30 received)"));
        assert!(run.shell.lines_for("h3").contains(&"sh -c wget -O - 10.0.0.1"));
        assert!(!run.shell.lines_for("h4").contains(&"sh -c true"));
    }
}
