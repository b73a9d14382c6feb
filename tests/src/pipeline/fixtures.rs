/// nmap output for one host with a closed ftp port and an open ssh port.
pub const SSH_HOST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sS -Pn -oX 10.0.0.1.xml 10.0.0.1" version="7.94">
  <host>
    <status state="up" reason="user-set"/>
    <address addr="10.0.0.1" addrtype="ipv4"/>
    <hostnames><hostname name="gw.lab.example" type="PTR"/></hostnames>
    <ports>
      <port protocol="tcp" portid="21">
        <state state="closed" reason="reset"/>
        <service name="ftp" method="table" conf="3"/>
      </port>
      <port protocol="tcp" portid="22">
        <state state="open" reason="syn-ack"/>
        <service name="ssh" product="OpenSSH" version="9.6p1" method="probed" conf="10"/>
      </port>
    </ports>
  </host>
</nmaprun>
"#;

/// A web host whose script output tries to inject markup.
pub const WEB_HOST: &str = r#"<nmaprun>
  <host>
    <status state="up"/>
    <address addr="10.0.0.3" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="80">
        <state state="open" reason="syn-ack"/>
        <service name="http"/>
        <script id="http-title" output="&lt;script&gt;alert('x')&lt;/script&gt;"/>
      </port>
    </ports>
  </host>
</nmaprun>
"#;

/// Output cut off in the middle of a host.
pub const TRUNCATED: &str = r#"<nmaprun><host><status state="up"/><address addr="10.0.0.2""#;
