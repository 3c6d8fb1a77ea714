#[cfg(test)]
pub mod test {
    use confique::Config;

    use crate::builder::ConfigLoader;
    use crate::capabilities::Capabilities;

    /// A small but complete configuration: global settings, a virtual host,
    /// a pattern block and a socket block.
    pub const SAMPLE: &str = r#"# sample configuration
server.port = 8080
server.modules = ( "mod_access", "mod_accesslog" )
server.document-root = "/srv/www/default"
server.indexfiles = ( "index.html", "index.htm" )
mimetype.assign = (
  ".html" => "text/html",
  ".css"  => "text/css",
)

$HTTPhost == "www.example.org" {
  server.document-root = "/srv/www/example.org"
  server.name = "www.example.org"
}

$HTTPurl =~ "^/cgi-bin/" {
  server.follow-symlink = "disable"
  server.max-read-idle = 5
}

$SERVERsocket == ":8443" {
  server.tag = "internal"
}
"#;

    /// Pattern matching on, TLS off, `poll` then `select`. Independent of the
    /// environment.
    pub fn capabilities() -> Capabilities {
        Capabilities {
            pattern_matching: true,
            tls: false,
            event_handlers: vec!["poll".into(), "select".into()],
        }
    }

    pub fn without_patterns() -> Capabilities {
        Capabilities {
            pattern_matching: false,
            ..capabilities()
        }
    }

    pub fn loader() -> ConfigLoader {
        ConfigLoader::new().capabilities(capabilities())
    }

    #[test]
    fn sample_loads() {
        let tree = loader().load_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(tree.nodes().len(), 4);
    }

    #[test]
    fn compiled_defaults_match_fixture() {
        let caps = Capabilities::builder().load().unwrap();
        assert_eq!(caps, capabilities());
    }
}
